//! Per-entity population over a whole source table.

use tracing::info;

use panel_core::{
    BatchReport, Calendar, EntityObservation, FillPolicy, PanelRow, source::group_by_entity,
};

use crate::populate::{PopulatedSeries, Populator};

/// Populates every entity of a source and concatenates the results.
///
/// Entities are processed in key order. An entity that fails or ends up
/// empty is recorded in the returned [`BatchReport`] and contributes no rows;
/// the rest of the batch continues.
pub fn populate_all(
    calendar: &Calendar,
    policy: FillPolicy,
    observations: Vec<EntityObservation>,
) -> (Vec<PopulatedSeries>, BatchReport) {
    let populator = Populator::new(calendar, policy);
    let mut report = BatchReport::new();
    let mut populated = Vec::new();

    for (entity, group) in group_by_entity(observations) {
        match populator.populate(&entity, &group) {
            Ok(series) if series.is_empty() => report.record_gap(entity),
            Ok(series) => {
                report.record_processed(entity);
                populated.push(series);
            }
            Err(e) => report.record_failure(entity, e),
        }
    }

    info!(
        policy = ?policy,
        entities = populated.len(),
        gaps = report.data_gaps.len(),
        failed = report.failed.len(),
        "Populated source"
    );
    (populated, report)
}

/// Flattens populated series into panel rows, ordered by (entity, period).
#[must_use]
pub fn concat_rows(series: Vec<PopulatedSeries>) -> Vec<PanelRow> {
    series
        .into_iter()
        .flat_map(PopulatedSeries::into_rows)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use panel_core::EntityId;

    fn obs(entity: &str, y: i32, m: u32, d: u32) -> EntityObservation {
        EntityObservation::new(EntityId::new(entity), NaiveDate::from_ymd_opt(y, m, d).unwrap())
            .with_field("rating", "A")
    }

    #[test]
    fn test_failures_are_isolated() {
        let calendar = Calendar::from_bounds((2010, 1), (2010, 12)).unwrap();
        let observations = vec![
            obs("GOOD", 2010, 1, 1),
            obs("BAD", 2010, 5, 1),
            obs("BAD", 2010, 4, 1),
            obs("LATE", 2022, 1, 1),
        ];
        let (series, report) = populate_all(&calendar, FillPolicy::Forward, observations);
        assert_eq!(series.len(), 1);
        assert_eq!(report.processed, vec![EntityId::new("GOOD")]);
        assert_eq!(report.data_gaps, vec![EntityId::new("LATE")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(concat_rows(series).len(), 12);
    }
}
