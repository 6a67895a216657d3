//! Sources holding their rows in memory.

use async_trait::async_trait;

use panel_core::{
    DataSource, EntityObservation, EntityProfile, ObservationSource, ReferenceSource,
    ReportingFrequency, Result, source::order_observations,
};

/// Observations supplied by the caller instead of a raw export.
#[derive(Clone, Debug)]
pub struct MemorySource {
    name: String,
    frequency: ReportingFrequency,
    observations: Vec<EntityObservation>,
}

impl MemorySource {
    /// Creates a source; observations are sorted by (entity, date) and
    /// entities supplied out of order are logged.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        frequency: ReportingFrequency,
        mut observations: Vec<EntityObservation>,
    ) -> Self {
        let name = name.into();
        order_observations(&name, &mut observations);
        Self {
            name,
            frequency,
            observations,
        }
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "In-memory observations"
    }
}

#[async_trait]
impl ObservationSource for MemorySource {
    fn frequency(&self) -> ReportingFrequency {
        self.frequency
    }

    async fn fetch_observations(&self) -> Result<Vec<EntityObservation>> {
        Ok(self.observations.clone())
    }
}

/// Company profiles supplied by the caller.
#[derive(Clone, Debug, Default)]
pub struct MemoryReference {
    profiles: Vec<EntityProfile>,
}

impl MemoryReference {
    /// Creates the source.
    #[must_use]
    pub const fn new(profiles: Vec<EntityProfile>) -> Self {
        Self { profiles }
    }
}

impl DataSource for MemoryReference {
    fn name(&self) -> &str {
        "memory_reference"
    }

    fn description(&self) -> &str {
        "In-memory company reference"
    }
}

#[async_trait]
impl ReferenceSource for MemoryReference {
    async fn fetch_profiles(&self) -> Result<Vec<EntityProfile>> {
        Ok(self.profiles.clone())
    }
}
