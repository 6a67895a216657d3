#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/esg-panel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Panel assembly for the ESG / credit rating study.
//!
//! - [`Panel`] - Keyed rows with an ordered column list
//! - [`PanelAssembler`] - Joins, completeness gate and not-rated exclusion
//! - [`add_dummies`] - Year, industry and country indicator columns
//! - [`summarize`] - One summary row per entity over a year window
//! - [`datasets`] - The H1 and H2 regression tables
//! - [`AnalysisInputs`] - Design matrices for each regression mode
//! - [`describe_by_year`] / [`coverage`] - Descriptive tables

/// Regression modes and design matrices.
pub mod analysis;
/// Joins and the assembly builder.
pub mod assembler;
/// Per-company vendor coverage.
pub mod coverage;
/// H1 and H2 dataset preparation.
pub mod datasets;
/// Per-year descriptive statistics.
pub mod describe;
/// Indicator columns.
pub mod dummies;
/// Conversion to and from polars frames.
pub mod frame;
/// The panel table.
pub mod panel;
/// Per-entity summaries.
pub mod summary;
/// Slicing, lagging and winsorizing.
pub mod transform;

pub use analysis::{AnalysisInputs, AnalysisMode, DesignMatrix, ModelSpec, OrderedCategories};
pub use assembler::{JoinKind, PanelAssembler, exclude_not_rated, join, join_profiles};
pub use coverage::{CompanyCoverage, Span, coverage, coverage_frame};
pub use datasets::{DatasetInputs, DatasetOptions, h1, h2_monthly, h2_summary, h2_yearly, sheets};
pub use describe::{YearStats, describe_by_year, stats_frame};
pub use dummies::{DummyKind, add_dummies, dummy_columns};
pub use frame::{write_csv, write_parquet};
pub use panel::Panel;
pub use summary::{EntitySummary, SummaryConfig, summarize};
pub use transform::{QuantileTail, quantile};
