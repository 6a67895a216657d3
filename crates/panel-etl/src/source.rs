//! File-backed sources over raw vendor exports.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

use panel_core::{
    DataSource, EntityObservation, EntityProfile, ObservationSource, RatingScale, ReferenceSource,
    ReportingFrequency, Result, source::order_observations,
};

use crate::ratings::{BloombergRatingChanges, SupervisorRatings, merge_ratings};
use crate::reference::parse_profiles;
use crate::sheet::RawSheet;
use crate::transform::Transform;

/// A CSV export read through a [`Transform`].
#[derive(Clone)]
pub struct SheetSource {
    name: String,
    path: PathBuf,
    transform: Arc<dyn Transform>,
    frequency: ReportingFrequency,
}

impl fmt::Debug for SheetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetSource")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("transform", &self.transform.name())
            .field("frequency", &self.frequency)
            .finish()
    }
}

impl SheetSource {
    /// Creates a source named `name` reading `path`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        transform: Arc<dyn Transform>,
        frequency: ReportingFrequency,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            transform,
            frequency,
        }
    }
}

impl DataSource for SheetSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Vendor export read from a CSV sheet"
    }
}

#[async_trait]
impl ObservationSource for SheetSource {
    fn frequency(&self) -> ReportingFrequency {
        self.frequency
    }

    #[instrument(skip(self), fields(source = %self.name, path = %self.path.display()))]
    async fn fetch_observations(&self) -> Result<Vec<EntityObservation>> {
        let sheet = RawSheet::read_csv(&self.path)?;
        let mut observations = self.transform.transform(&sheet)?;
        order_observations(&self.name, &mut observations);
        debug!(observations = observations.len(), "Fetched sheet source");
        Ok(observations)
    }
}

/// The two S&P rating feeds, merged and encoded.
#[derive(Clone, Debug)]
pub struct RatingFeeds {
    supervisor: PathBuf,
    changes: PathBuf,
    profiles: Vec<EntityProfile>,
    scale: RatingScale,
}

impl RatingFeeds {
    /// Creates the source; `profiles` map supervisor company ids to tickers.
    #[must_use]
    pub fn new(
        supervisor: impl Into<PathBuf>,
        changes: impl Into<PathBuf>,
        profiles: Vec<EntityProfile>,
        scale: RatingScale,
    ) -> Self {
        Self {
            supervisor: supervisor.into(),
            changes: changes.into(),
            profiles,
            scale,
        }
    }
}

impl DataSource for RatingFeeds {
    fn name(&self) -> &str {
        crate::transform::sources::RATINGS
    }

    fn description(&self) -> &str {
        "S&P long-term issuer ratings from the supervisor and Bloomberg feeds"
    }
}

#[async_trait]
impl ObservationSource for RatingFeeds {
    fn frequency(&self) -> ReportingFrequency {
        ReportingFrequency::Event
    }

    #[instrument(skip(self))]
    async fn fetch_observations(&self) -> Result<Vec<EntityObservation>> {
        let supervisor_feed = SupervisorRatings::new(&self.profiles);
        let mut supervisor = supervisor_feed.transform(&RawSheet::read_csv(&self.supervisor)?)?;
        order_observations(supervisor_feed.name(), &mut supervisor);
        let changes_feed = BloombergRatingChanges::new();
        let mut changes = changes_feed.transform(&RawSheet::read_csv(&self.changes)?)?;
        order_observations(changes_feed.name(), &mut changes);
        let (ratings, report) = merge_ratings(vec![supervisor, changes], self.scale);
        report.log(crate::transform::sources::RATINGS);
        Ok(ratings)
    }
}

/// The company reference sheet.
#[derive(Clone, Debug)]
pub struct ReferenceSheet {
    path: PathBuf,
}

impl ReferenceSheet {
    /// Creates the source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for ReferenceSheet {
    fn name(&self) -> &str {
        "company_info"
    }

    fn description(&self) -> &str {
        "Company tickers, identifiers and classification"
    }
}

#[async_trait]
impl ReferenceSource for ReferenceSheet {
    async fn fetch_profiles(&self) -> Result<Vec<EntityProfile>> {
        parse_profiles(&RawSheet::read_csv(&self.path)?)
    }
}
