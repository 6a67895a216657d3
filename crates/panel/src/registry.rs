//! Source registry that reads through the table store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use panel_core::{
    EntityObservation, EntityProfile, ObservationSource, PanelError, ReferenceSource,
    ReportingFrequency, Result, TableStore,
};

/// Registry of the sources feeding the pipeline.
///
/// Observation sources are looked up by name. When a store is configured it
/// is checked first and every fresh fetch is written back, so later stages
/// read what `clean` produced without touching the raw exports again.
///
/// # Example
///
/// ```rust,ignore
/// use panel::{SourceRegistry, InMemoryStore, ReferenceSheet};
/// use std::sync::Arc;
///
/// let mut registry = SourceRegistry::with_store(Arc::new(InMemoryStore::new()));
/// registry.register_reference(Arc::new(ReferenceSheet::new("raw/company_info.csv")));
///
/// let profiles = registry.fetch_profiles().await?;
/// ```
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn ObservationSource>>,
    reference: Option<Arc<dyn ReferenceSource>>,
    store: Option<Arc<dyn TableStore>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("reference", &self.reference.as_ref().map(|r| r.name()))
            .field("store", &self.store.as_ref().map(|_| "configured"))
            .finish()
    }
}

impl SourceRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry reading through a store.
    #[must_use]
    pub fn with_store(store: Arc<dyn TableStore>) -> Self {
        Self {
            store: Some(store),
            ..Default::default()
        }
    }

    /// Set the store for this registry.
    #[must_use]
    pub fn set_store(mut self, store: Arc<dyn TableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an observation source; a source with the same name is replaced.
    pub fn register_observations(&mut self, source: Arc<dyn ObservationSource>) {
        debug!(source = source.name(), "Registering observation source");
        self.sources.retain(|s| s.name() != source.name());
        self.sources.push(source);
    }

    /// Register the company reference source.
    pub fn register_reference(&mut self, source: Arc<dyn ReferenceSource>) {
        debug!(source = source.name(), "Registering reference source");
        self.reference = Some(source);
    }

    /// Names of the registered observation sources in registration order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    fn source(&self, name: &str) -> Result<&Arc<dyn ObservationSource>> {
        self.sources
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| PanelError::SourceNotConfigured(format!("No source named {name:?}")))
    }

    /// Reporting frequency of a registered source.
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] for an unknown name.
    pub fn frequency(&self, name: &str) -> Result<ReportingFrequency> {
        Ok(self.source(name)?.frequency())
    }

    /// Fetch a source's observations, from the store when present.
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] for an unknown name and
    /// propagates the source's error on a store miss.
    pub async fn fetch_observations(&self, name: &str) -> Result<Vec<EntityObservation>> {
        let source = self.source(name)?;

        if let Some(store) = &self.store {
            if let Ok(Some(cached)) = store.get_observations(name).await {
                debug!(source = name, rows = cached.len(), "Store hit for observations");
                return Ok(cached);
            }
        }

        debug!(source = name, "Fetching observations");
        let observations = source.fetch_observations().await?;
        self.write_back(name, &observations).await;
        Ok(observations)
    }

    /// Fetch a source's observations from the source itself and overwrite the stored copy.
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] for an unknown name and
    /// propagates source and store errors.
    pub async fn refresh(&self, name: &str) -> Result<usize> {
        let observations = self.source(name)?.fetch_observations().await?;
        if let Some(store) = &self.store {
            store.put_observations(name, &observations).await?;
        }
        info!(source = name, rows = observations.len(), "Refreshed source");
        Ok(observations.len())
    }

    /// Fetch the company reference, from the store when present.
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] if neither the store nor a
    /// reference source can provide the profiles.
    pub async fn fetch_profiles(&self) -> Result<Vec<EntityProfile>> {
        if let Some(store) = &self.store {
            if let Ok(Some(cached)) = store.get_profiles().await {
                debug!(profiles = cached.len(), "Store hit for company reference");
                return Ok(cached);
            }
        }
        self.refresh_profiles().await
    }

    /// Fetch the company reference from its source and overwrite the stored copy.
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] if no reference source is registered.
    pub async fn refresh_profiles(&self) -> Result<Vec<EntityProfile>> {
        let reference = self.reference.as_ref().ok_or_else(|| {
            PanelError::SourceNotConfigured("No reference source registered".to_string())
        })?;
        let profiles = reference.fetch_profiles().await?;
        if let Some(store) = &self.store {
            if let Err(e) = store.put_profiles(&profiles).await {
                warn!(source = reference.name(), error = %e, "Failed to store company reference");
            }
        }
        Ok(profiles)
    }

    async fn write_back(&self, name: &str, observations: &[EntityObservation]) {
        if let Some(store) = &self.store {
            if let Err(e) = store.put_observations(name, observations).await {
                warn!(source = name, error = %e, "Failed to store observations");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReference, MemorySource};
    use chrono::NaiveDate;
    use panel_core::EntityId;
    use panel_store::InMemoryStore;

    fn obs(entity: &str, year: i32, month: u32, value: f64) -> EntityObservation {
        EntityObservation::new(
            EntityId::new(entity),
            NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
        )
        .with_field("value", value)
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let registry = SourceRegistry::new();
        assert!(matches!(
            registry.fetch_observations("ratings").await,
            Err(PanelError::SourceNotConfigured(_))
        ));
        assert!(matches!(
            registry.fetch_profiles().await,
            Err(PanelError::SourceNotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_store_is_read_first() {
        let store = Arc::new(InMemoryStore::new());
        let stored = vec![obs("STORED", 2010, 1, 1.0)];
        store.put_observations("controls", &stored).await.unwrap();

        let mut registry = SourceRegistry::with_store(store);
        registry.register_observations(Arc::new(MemorySource::new(
            "controls",
            ReportingFrequency::Annual,
            vec![obs("FRESH", 2010, 1, 2.0)],
        )));

        let fetched = registry.fetch_observations("controls").await.unwrap();
        assert_eq!(fetched[0].entity, EntityId::new("STORED"));

        registry.refresh("controls").await.unwrap();
        let fetched = registry.fetch_observations("controls").await.unwrap();
        assert_eq!(fetched[0].entity, EntityId::new("FRESH"));
    }

    #[tokio::test]
    async fn test_miss_writes_back() {
        let store = Arc::new(InMemoryStore::new());
        let mut registry = SourceRegistry::with_store(store.clone());
        registry.register_observations(Arc::new(MemorySource::new(
            "ratings",
            ReportingFrequency::Event,
            vec![obs("A", 2010, 1, 14.0)],
        )));
        registry.register_reference(Arc::new(MemoryReference::new(vec![EntityProfile::new(
            EntityId::new("A"),
        )])));

        registry.fetch_observations("ratings").await.unwrap();
        registry.fetch_profiles().await.unwrap();
        assert_eq!(store.get_observations("ratings").await.unwrap().unwrap().len(), 1);
        assert_eq!(store.get_profiles().await.unwrap().unwrap().len(), 1);
        assert_eq!(registry.frequency("ratings").unwrap(), ReportingFrequency::Event);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = SourceRegistry::new();
        for _ in 0..2 {
            registry.register_observations(Arc::new(MemorySource::new(
                "controls",
                ReportingFrequency::Annual,
                Vec::new(),
            )));
        }
        assert_eq!(registry.source_names(), vec!["controls"]);
        assert!(format!("{registry:?}").contains("controls"));
    }
}
