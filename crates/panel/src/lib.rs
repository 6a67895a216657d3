#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/esg-panel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Pipeline facade for the ESG / credit rating study.
//!
//! This crate re-exports the core types and the stage crates, and provides
//! a [`SourceRegistry`] reading sources through a table store and a
//! [`ThesisPipeline`] running the stages in order.
//!
//! # Features
//!
//! - `store-sqlite` - SQLite-backed table store (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use panel::{AnalysisMode, ExportEngine, Hypothesis, PipelineConfig, ThesisPipeline};
//!
//! #[tokio::main]
//! async fn main() -> panel::Result<()> {
//!     let config = PipelineConfig::load("panel.json".as_ref())?;
//!     let mut pipeline = ThesisPipeline::open(config).await?;
//!
//!     pipeline.clean().await?;
//!     pipeline.prepare(Hypothesis::H1, None).await?;
//!     pipeline.prepare(Hypothesis::H2, None).await?;
//!     pipeline
//!         .regress(AnalysisMode::Main, &ExportEngine::new("out/models"))
//!         .await?;
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use panel_core::*;

// Stores
#[cfg(feature = "store-sqlite")]
pub use panel_store::SqliteStore;
pub use panel_store::{InMemoryStore, NoopStore};

// Stages
pub use panel_assemble::{
    AnalysisInputs, AnalysisMode, DatasetInputs, DatasetOptions, DesignMatrix, ModelSpec, Panel,
    PanelAssembler, SummaryConfig,
};
pub use panel_etl::{RatingFeeds, RawSheet, ReferenceSheet, SheetSource, Transform, run_etl};
pub use panel_series::{PopulatedSeries, Populator, populate_all};

mod config;
mod engine;
mod memory;
mod pipeline;
mod registry;

pub use config::{PipelineConfig, RawFiles};
pub use engine::{ExportEngine, RegressionEngine};
pub use memory::{MemoryReference, MemorySource};
pub use pipeline::{COVERAGE_SHEET, Hypothesis, ThesisPipeline, describe_sheet};
pub use registry::SourceRegistry;
