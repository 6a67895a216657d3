#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/esg-panel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cleaning of raw vendor exports into long tables.
//!
//! - [`RawSheet`] - A sheet of text cells read from CSV or a frame
//! - [`BloombergWide`] - Bloomberg ticker blocks into (ticker, date) rows
//! - [`RefinitivWide`] - Eikon `ISIN(CODE)` columns mapped to tickers
//! - [`merge_ratings`] - Supervisor and Bloomberg rating feeds combined and encoded
//! - [`parse_profiles`] - The company reference
//! - [`SheetSource`] / [`RatingFeeds`] / [`ReferenceSheet`] - File-backed sources
//! - [`run_etl`] - Transform a sheet and persist the result

/// Bloomberg wide exports.
pub mod bloomberg;
/// S&P rating feeds.
pub mod ratings;
/// Company reference sheet.
pub mod reference;
/// Refinitiv wide exports.
pub mod refinitiv;
/// Raw sheets of text cells.
pub mod sheet;
/// File-backed sources.
pub mod source;
/// The transform trait and ETL runner.
pub mod transform;

pub use bloomberg::{BloombergEsg, BloombergLayout, BloombergWide, split_providers};
pub use ratings::{
    BloombergRatingChanges, LT_FOREIGN_ISSUER, SupervisorRatings, merge_ratings,
    split_current_rating,
};
pub use reference::{TICKER_HEADER, parse_profiles};
pub use refinitiv::{RefinitivWide, split_code};
pub use sheet::{RawSheet, parse_date};
pub use source::{RatingFeeds, ReferenceSheet, SheetSource};
pub use transform::{Transform, run_etl, sources};
