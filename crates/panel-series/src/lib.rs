#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/esg-panel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Entity time series on the monthly calendar.
//!
//! - [`Populator`] - Collapse, align and fill one entity's observations
//! - [`populate_all`] - Per-entity population over a whole source with a [`BatchReport`](panel_core::BatchReport)
//! - [`forward_changes`] / [`annotate_changes`] - Forward rating deltas per entity
//! - [`year_end`] - Collapse monthly rows to the last month of each year

/// Batch population over many entities.
pub mod batch;
/// Forward rating changes.
pub mod change;
/// Calendar alignment and fill policies.
pub mod populate;
/// Year-end collapse.
pub mod yearly;

pub use batch::{concat_rows, populate_all};
pub use change::{annotate_changes, forward_changes};
pub use populate::{PopulatedSeries, Populator};
pub use yearly::year_end;
