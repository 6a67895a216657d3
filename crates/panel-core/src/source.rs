//! Source traits for loading vendor data.
//!
//! This module defines the core source traits:
//!
//! - [`DataSource`] - Base trait for all sources
//! - [`ObservationSource`] - Dated per-entity observations (ESG scores, ratings, accounts)
//! - [`ReferenceSource`] - Company reference information

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::warn;

use crate::{
    error::{PanelError, Result},
    frequency::ReportingFrequency,
    types::{EntityId, EntityObservation, EntityProfile},
};

/// Base trait for all data sources.
pub trait DataSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "refinitiv").
    fn name(&self) -> &str;

    /// Returns a description of this source.
    fn description(&self) -> &str;
}

/// Source of dated per-entity observations.
#[async_trait]
pub trait ObservationSource: DataSource {
    /// Cadence at which this source publishes values.
    fn frequency(&self) -> ReportingFrequency;

    /// Loads every observation, sorted by (entity, date).
    async fn fetch_observations(&self) -> Result<Vec<EntityObservation>>;

    /// Loads the observations of one entity.
    ///
    /// Default implementation filters [`fetch_observations`](Self::fetch_observations).
    async fn fetch_entity(&self, entity: &EntityId) -> Result<Vec<EntityObservation>> {
        let observations = self.fetch_observations().await?;
        let selected: Vec<_> = observations
            .into_iter()
            .filter(|o| &o.entity == entity)
            .collect();
        if selected.is_empty() {
            return Err(PanelError::Other(format!(
                "{} has no observations for {entity}",
                self.name()
            )));
        }
        Ok(selected)
    }
}

/// Source of company reference information.
#[async_trait]
pub trait ReferenceSource: DataSource {
    /// Loads every company profile.
    async fn fetch_profiles(&self) -> Result<Vec<EntityProfile>>;
}

/// Groups observations by entity, preserving input order within each entity.
#[must_use]
pub fn group_by_entity(
    observations: Vec<EntityObservation>,
) -> BTreeMap<EntityId, Vec<EntityObservation>> {
    let mut groups: BTreeMap<EntityId, Vec<EntityObservation>> = BTreeMap::new();
    for observation in observations {
        groups
            .entry(observation.entity.clone())
            .or_default()
            .push(observation);
    }
    groups
}

/// Sorts observations by (entity, date). The sort is stable, so same-day
/// observations keep their input order.
pub fn sort_observations(observations: &mut [EntityObservation]) {
    observations.sort_by(|a, b| a.entity.cmp(&b.entity).then(a.date.cmp(&b.date)));
}

/// Counts, per entity, the rows dated before an earlier row of the same entity.
///
/// Entities whose rows arrive in chronological order are absent.
#[must_use]
pub fn date_inversions(observations: &[EntityObservation]) -> BTreeMap<EntityId, usize> {
    let mut latest: BTreeMap<&EntityId, NaiveDate> = BTreeMap::new();
    let mut inversions: BTreeMap<EntityId, usize> = BTreeMap::new();
    for observation in observations {
        match latest.get_mut(&observation.entity) {
            Some(date) if observation.date < *date => {
                *inversions.entry(observation.entity.clone()).or_default() += 1;
            }
            Some(date) => *date = observation.date,
            None => {
                latest.insert(&observation.entity, observation.date);
            }
        }
    }
    inversions
}

/// Sorts the observations of `source` by (entity, date), logging each entity
/// whose rows were out of chronological order.
///
/// Returns the inversions per entity found before sorting.
pub fn order_observations(
    source: &str,
    observations: &mut [EntityObservation],
) -> BTreeMap<EntityId, usize> {
    let inversions = date_inversions(observations);
    for (entity, count) in &inversions {
        warn!(source, entity = %entity, inversions = count, "Observations out of chronological order");
    }
    sort_observations(observations);
    inversions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use chrono::{Datelike, NaiveDate};

    fn obs(entity: &str, day: u32) -> EntityObservation {
        EntityObservation::new(
            EntityId::new(entity),
            NaiveDate::from_ymd_opt(2010, 1, day).unwrap(),
        )
    }

    #[test]
    fn test_group_by_entity() {
        let groups = group_by_entity(vec![obs("B", 1), obs("A", 2), obs("B", 3)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&EntityId::new("B")].len(), 2);
        let keys: Vec<_> = groups.keys().map(EntityId::as_str).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn test_sort_observations_is_stable() {
        let mut list = vec![
            obs("B", 2).with_field("v", 1.0),
            obs("A", 5),
            obs("B", 2).with_field("v", 2.0),
            obs("B", 1),
        ];
        sort_observations(&mut list);
        assert_eq!(list[0].entity.as_str(), "A");
        assert_eq!(list[1].date.to_string(), "2010-01-01");
        assert_eq!(list[2].get("v"), Some(&FieldValue::Number(1.0)));
        assert_eq!(list[3].get("v"), Some(&FieldValue::Number(2.0)));
    }

    #[test]
    fn test_date_inversions_per_entity() {
        let list = vec![obs("A", 3), obs("B", 9), obs("A", 1), obs("A", 2), obs("B", 10)];
        let inversions = date_inversions(&list);
        assert_eq!(inversions.len(), 1);
        assert_eq!(inversions[&EntityId::new("A")], 2);
        assert!(date_inversions(&[obs("A", 1), obs("B", 1), obs("A", 1)]).is_empty());
    }

    #[test]
    fn test_order_observations_reports_then_sorts() {
        let mut list = vec![obs("B", 4), obs("B", 2), obs("A", 1)];
        let inversions = order_observations("test", &mut list);
        assert_eq!(inversions.get(&EntityId::new("B")), Some(&1));
        let order: Vec<_> = list.iter().map(|o| (o.entity.as_str(), o.date.day0())).collect();
        assert_eq!(order, vec![("A", 0), ("B", 1), ("B", 3)]);
    }
}
