//! No-op store implementation.

use async_trait::async_trait;
use panel_core::{EntityObservation, EntityProfile, Result, TableStore};
use polars::prelude::DataFrame;
use std::time::Duration;
use tracing::trace;

/// A store that keeps nothing.
///
/// All `get_*` methods return `Ok(None)` and all `put_*` methods return `Ok(())`.
/// Useful for running the stages without persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl NoopStore {
    /// Create a new no-op store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TableStore for NoopStore {
    async fn get_observations(&self, _source: &str) -> Result<Option<Vec<EntityObservation>>> {
        trace!("NoopStore: get_observations called, returning None");
        Ok(None)
    }

    async fn put_observations(
        &self,
        _source: &str,
        _observations: &[EntityObservation],
    ) -> Result<()> {
        trace!("NoopStore: put_observations called, doing nothing");
        Ok(())
    }

    async fn get_profiles(&self) -> Result<Option<Vec<EntityProfile>>> {
        trace!("NoopStore: get_profiles called, returning None");
        Ok(None)
    }

    async fn put_profiles(&self, _profiles: &[EntityProfile]) -> Result<()> {
        trace!("NoopStore: put_profiles called, doing nothing");
        Ok(())
    }

    async fn get_frame(&self, _sheet: &str) -> Result<Option<DataFrame>> {
        trace!("NoopStore: get_frame called, returning None");
        Ok(None)
    }

    async fn put_frame(&self, _sheet: &str, _frame: &DataFrame) -> Result<()> {
        trace!("NoopStore: put_frame called, doing nothing");
        Ok(())
    }

    async fn sheets(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        trace!("NoopStore: invalidate_stale called, returning 0");
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopStore: clear called, doing nothing");
        Ok(())
    }
}
