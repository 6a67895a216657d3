#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/esg-panel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and traits for the ESG and credit rating panel.
//!
//! This crate provides the foundational abstractions shared by every stage:
//!
//! - [`Calendar`](calendar::Calendar) - Canonical gapless monthly calendar
//! - [`RatingScale`](rating::RatingScale) - Agency symbol to ordinal encoding
//! - [`FillPolicy`](frequency::FillPolicy) - How sparse values spread over months
//! - [`ObservationSource`](source::ObservationSource) - Dated vendor observations
//! - [`ReferenceSource`](source::ReferenceSource) - Company metadata
//! - [`TableStore`](store::TableStore) - Persistence between stages
//! - [`BatchReport`](report::BatchReport) / [`FilterReport`](report::FilterReport) - Soft outcomes

/// Monthly calendar generation.
pub mod calendar;
/// ESG rating providers.
pub mod esg;
/// Error types for panel operations.
pub mod error;
/// Column names shared across stages.
pub mod fields;
/// Reporting frequency and fill policy definitions.
pub mod frequency;
/// Credit rating scales and grades.
pub mod rating;
/// Batch and filter reports.
pub mod report;
/// Source traits for loading vendor data.
pub mod source;
/// Store trait for persisting tables.
pub mod store;
/// Core data types (EntityId, CalendarPeriod, EntityObservation, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use calendar::Calendar;
pub use error::{PanelError, Result};
pub use esg::EsgProvider;
pub use frequency::{FillPolicy, ReportingFrequency};
pub use rating::{Grade, NOT_RATED, OrdinalRating, RatingScale};
pub use report::{BatchReport, FilterReport};
pub use source::{DataSource, ObservationSource, ReferenceSource};
pub use store::TableStore;
pub use types::{
    CalendarPeriod, EntityId, EntityObservation, EntityProfile, FieldValue, PanelRow, Record,
};
