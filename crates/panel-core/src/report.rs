//! Soft outcome reports.
//!
//! Nothing in the pipeline is dropped silently: rows removed by filters are
//! counted in a [`FilterReport`], and entities that produced no data or failed
//! are listed in a [`BatchReport`].

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PanelError;
use crate::types::EntityId;

/// Rows removed by the panel filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Rows before filtering.
    pub rows_in: usize,
    /// Rows dropped because a required column was null.
    pub incomplete: usize,
    /// Rows dropped because the rating was `NR`.
    pub not_rated: usize,
}

impl FilterReport {
    /// Rows left after filtering.
    #[must_use]
    pub const fn rows_out(&self) -> usize {
        self.rows_in - self.incomplete - self.not_rated
    }

    /// Logs the counts at info level.
    pub fn log(&self, table: &str) {
        info!(
            table,
            rows_in = self.rows_in,
            incomplete = self.incomplete,
            not_rated = self.not_rated,
            rows_out = self.rows_out(),
            "Filtered panel rows"
        );
    }
}

/// Outcome of a per-entity batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Entities that produced rows.
    pub processed: Vec<EntityId>,
    /// Entities with no rows left after alignment and trimming.
    pub data_gaps: Vec<EntityId>,
    /// Entities that failed, with their error.
    pub failed: Vec<(EntityId, PanelError)>,
}

impl BatchReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful entity.
    pub fn record_processed(&mut self, entity: EntityId) {
        self.processed.push(entity);
    }

    /// Records an entity that produced no rows.
    pub fn record_gap(&mut self, entity: EntityId) {
        warn!(entity = %entity, "No data left after alignment");
        self.data_gaps.push(entity);
    }

    /// Records a failed entity.
    pub fn record_failure(&mut self, entity: EntityId, error: PanelError) {
        warn!(entity = %entity, error = %error, "Entity failed");
        self.failed.push((entity, error));
    }

    /// Returns true if every entity was processed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.data_gaps.is_empty() && self.failed.is_empty()
    }

    /// Merges another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.processed.extend(other.processed);
        self.data_gaps.extend(other.data_gaps);
        self.failed.extend(other.failed);
    }

    /// Logs a one-line summary.
    pub fn log(&self, stage: &str) {
        info!(
            stage,
            processed = self.processed.len(),
            data_gaps = self.data_gaps.len(),
            failed = self.failed.len(),
            "Batch finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_report_rows_out() {
        let report = FilterReport {
            rows_in: 10,
            incomplete: 3,
            not_rated: 2,
        };
        assert_eq!(report.rows_out(), 5);
    }

    #[test]
    fn test_batch_report_merge() {
        let mut a = BatchReport::new();
        a.record_processed(EntityId::new("A"));
        let mut b = BatchReport::new();
        b.record_gap(EntityId::new("B"));
        b.record_failure(EntityId::new("C"), PanelError::Other("boom".into()));
        a.merge(b);
        assert_eq!(a.processed.len(), 1);
        assert_eq!(a.data_gaps, vec![EntityId::new("B")]);
        assert_eq!(a.failed.len(), 1);
        assert!(!a.is_clean());
    }
}
