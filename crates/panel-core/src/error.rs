//! Error types for panel operations.
//!
//! This module defines [`PanelError`] which covers every failure that can occur
//! while cleaning vendor exports, populating series, assembling panels or
//! persisting tables.

use thiserror::Error;

/// Errors that can occur during panel operations.
#[derive(Error, Debug)]
pub enum PanelError {
    /// A calendar bound is not a valid period, or the start lies after the end.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// A rating symbol outside the encoding table.
    #[error("Unmapped rating symbol: {0:?}")]
    UnmappedSymbol(String),

    /// An entity carries more than one distinct value for a classification.
    #[error("Entity {entity} has {count} distinct values for {field}")]
    NonUniqueClassification {
        /// The entity being summarized.
        entity: String,
        /// Classification column (industry or country).
        field: String,
        /// Number of distinct values observed.
        count: usize,
    },

    /// Observations for an entity are not in chronological order.
    #[error("Observations for {entity} are out of order at {date}")]
    NonChronological {
        /// The entity whose series is unordered.
        entity: String,
        /// The first date found before its predecessor.
        date: String,
    },

    /// An observation belonging to another entity was passed to a per-entity routine.
    #[error("Expected observations for {expected}, found {found}")]
    EntityMismatch {
        /// The entity being processed.
        expected: String,
        /// The entity found in the input.
        found: String,
    },

    /// A date cell in a raw export is not a recognizable date.
    #[error("Malformed date {value:?} in {sheet}")]
    MalformedDate {
        /// Sheet being read.
        sheet: String,
        /// The offending cell.
        value: String,
    },

    /// A required column is missing from a table.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Two joined tables carry the same non-key column.
    #[error("Column {0} exists in more than one source")]
    ColumnConflict(String),

    /// A date or value in a raw export could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with a table store.
    #[error("Store error: {0}")]
    Store(String),

    /// Error reading or writing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by polars while building or reading frames.
    #[error("DataFrame error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    /// The requested source is not registered.
    #[error("Source not configured: {0}")]
    SourceNotConfigured(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`PanelError`].
pub type Result<T> = std::result::Result<T, PanelError>;
