//! In-memory store implementation.

use async_trait::async_trait;
use chrono::Utc;
use panel_core::{EntityObservation, EntityProfile, Result, TableStore};
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Stored value with timestamp for TTL-based invalidation.
#[derive(Debug, Clone)]
struct StoreEntry<T> {
    data: T,
    stored_at: chrono::DateTime<Utc>,
}

impl<T> StoreEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            stored_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.stored_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// In-memory store for tests and single-run pipelines.
///
/// Tables live in `RwLock`-protected maps and are lost when the store is
/// dropped. Values are cloned on get/put.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    observations: RwLock<HashMap<String, StoreEntry<Vec<EntityObservation>>>>,
    profiles: RwLock<Option<StoreEntry<Vec<EntityProfile>>>>,
    frames: RwLock<BTreeMap<String, StoreEntry<DataFrame>>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    #[instrument(skip(self))]
    async fn get_observations(&self, source: &str) -> Result<Option<Vec<EntityObservation>>> {
        let store = self.observations.read().await;
        match store.get(source) {
            Some(entry) => {
                debug!(count = entry.data.len(), "Store hit for observations");
                Ok(Some(entry.data.clone()))
            }
            None => {
                debug!("Store miss for observations");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, observations), fields(count = observations.len()))]
    async fn put_observations(
        &self,
        source: &str,
        observations: &[EntityObservation],
    ) -> Result<()> {
        let mut store = self.observations.write().await;
        store.insert(source.to_string(), StoreEntry::new(observations.to_vec()));
        debug!("Stored observations");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_profiles(&self) -> Result<Option<Vec<EntityProfile>>> {
        Ok(self.profiles.read().await.as_ref().map(|e| e.data.clone()))
    }

    #[instrument(skip(self, profiles), fields(count = profiles.len()))]
    async fn put_profiles(&self, profiles: &[EntityProfile]) -> Result<()> {
        *self.profiles.write().await = Some(StoreEntry::new(profiles.to_vec()));
        debug!("Stored profiles");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_frame(&self, sheet: &str) -> Result<Option<DataFrame>> {
        let store = self.frames.read().await;
        Ok(store.get(sheet).map(|e| e.data.clone()))
    }

    #[instrument(skip(self, frame), fields(rows = frame.height()))]
    async fn put_frame(&self, sheet: &str, frame: &DataFrame) -> Result<()> {
        let mut store = self.frames.write().await;
        store.insert(sheet.to_string(), StoreEntry::new(frame.clone()));
        debug!("Stored frame");
        Ok(())
    }

    async fn sheets(&self) -> Result<Vec<String>> {
        Ok(self.frames.read().await.keys().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut total_removed = 0usize;

        {
            let mut store = self.observations.write().await;
            let before = store.len();
            store.retain(|_, entry| !entry.is_stale(ttl));
            total_removed += before - store.len();
        }

        {
            let mut profiles = self.profiles.write().await;
            if profiles.as_ref().is_some_and(|e| e.is_stale(ttl)) {
                *profiles = None;
                total_removed += 1;
            }
        }

        {
            let mut store = self.frames.write().await;
            let before = store.len();
            store.retain(|_, entry| !entry.is_stale(ttl));
            total_removed += before - store.len();
        }

        if total_removed > 0 {
            debug!("Invalidated {} stale store entries", total_removed);
        }
        Ok(total_removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.observations.write().await.clear();
        *self.profiles.write().await = None;
        self.frames.write().await.clear();
        debug!("Cleared all store entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use panel_core::EntityId;
    use polars::prelude::Column;

    fn observation() -> EntityObservation {
        EntityObservation::new(
            EntityId::new("VOD LN Equity"),
            NaiveDate::from_ymd_opt(2012, 3, 31).unwrap(),
        )
        .with_field("TRESGS", 61.5)
    }

    #[tokio::test]
    async fn test_memory_store_observations() {
        let store = InMemoryStore::new();
        assert!(store.get_observations("refinitiv").await.unwrap().is_none());

        store
            .put_observations("refinitiv", &[observation()])
            .await
            .unwrap();
        let back = store.get_observations("refinitiv").await.unwrap().unwrap();
        assert_eq!(back, vec![observation()]);
        assert!(store.get_observations("ratings").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_frames_listed_by_sheet() {
        let store = InMemoryStore::new();
        let df = DataFrame::new(vec![Column::new("x".into(), vec![1.0, 2.0])]).unwrap();
        store.put_frame("h2_summary", &df).await.unwrap();
        store.put_frame("h1_refinitiv", &df).await.unwrap();

        assert_eq!(
            store.sheets().await.unwrap(),
            vec!["h1_refinitiv".to_string(), "h2_summary".to_string()]
        );
        assert_eq!(store.get_frame("h2_summary").await.unwrap().unwrap().height(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_stale_and_clear() {
        let store = InMemoryStore::new();
        store
            .put_profiles(&[EntityProfile::new(EntityId::new("A"))])
            .await
            .unwrap();
        store.put_observations("ratings", &[observation()]).await.unwrap();

        let removed = store
            .invalidate_stale(Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let removed = store
            .invalidate_stale(Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.get_profiles().await.unwrap().is_none());

        store.put_observations("ratings", &[observation()]).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get_observations("ratings").await.unwrap().is_none());
    }
}
