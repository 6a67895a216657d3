//! The transform seam and the ETL driver.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{info, instrument};

use panel_core::{
    EntityId, EntityObservation, FieldValue, Record, Result, TableStore,
    source::order_observations,
};

use crate::sheet::RawSheet;

/// Store keys of the cleaned sources.
pub mod sources {
    /// Encoded credit ratings.
    pub const RATINGS: &str = "ratings";
    /// Annual accounting controls.
    pub const CONTROLS: &str = "controls";
}

/// Turns one raw vendor sheet into long observations.
pub trait Transform: Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Reshapes the sheet.
    ///
    /// # Errors
    /// Returns an error if the sheet does not have the expected layout.
    fn transform(&self, sheet: &RawSheet) -> Result<Vec<EntityObservation>>;
}

/// Extracts, transforms and loads one sheet into the store under `destination`.
///
/// Observations are sorted by (entity, date) before they are stored; entities
/// whose rows arrived out of order are logged first. Returns the number of
/// stored observations.
///
/// # Errors
/// Propagates transform and store errors.
#[instrument(skip(sheet, transform, store), fields(sheet = sheet.name(), transform = transform.name()))]
pub async fn run_etl(
    sheet: &RawSheet,
    transform: &dyn Transform,
    store: &dyn TableStore,
    destination: &str,
) -> Result<usize> {
    let mut observations = transform.transform(sheet)?;
    order_observations(destination, &mut observations);
    store.put_observations(destination, &observations).await?;
    info!(
        observations = observations.len(),
        destination, "Loaded cleaned observations"
    );
    Ok(observations.len())
}

/// Long rows keyed by (entity, date); the first value of a field wins.
#[derive(Debug, Default)]
pub(crate) struct LongTable {
    rows: BTreeMap<(EntityId, NaiveDate), Record>,
}

impl LongTable {
    pub(crate) fn insert(
        &mut self,
        entity: &EntityId,
        date: NaiveDate,
        field: &str,
        value: FieldValue,
    ) {
        self.rows
            .entry((entity.clone(), date))
            .or_default()
            .entry(field.to_string())
            .or_insert(value);
    }

    pub(crate) fn into_observations(self) -> Vec<EntityObservation> {
        self.rows
            .into_iter()
            .map(|((entity, date), fields)| EntityObservation {
                entity,
                date,
                fields,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_store::InMemoryStore;

    #[derive(Debug)]
    struct Reversed;

    impl Transform for Reversed {
        fn name(&self) -> &str {
            "reversed"
        }

        fn transform(&self, sheet: &RawSheet) -> Result<Vec<EntityObservation>> {
            let date = NaiveDate::from_ymd_opt(2010, 1, 31).unwrap();
            let mut observations: Vec<_> = sheet
                .rows_from(0)
                .filter_map(|(_, row)| row[0].as_deref().map(EntityId::new))
                .map(|entity| EntityObservation::new(entity, date))
                .collect();
            observations.reverse();
            Ok(observations)
        }
    }

    #[tokio::test]
    async fn test_run_etl_sorts_and_stores() {
        let store = InMemoryStore::new();
        let sheet = RawSheet::from_text("names", &[vec!["A"], vec!["C"], vec!["B"]]);

        let count = run_etl(&sheet, &Reversed, &store, "names").await.unwrap();
        assert_eq!(count, 3);
        let stored = store.get_observations("names").await.unwrap().unwrap();
        let entities: Vec<_> = stored.iter().map(|o| o.entity.as_str()).collect();
        assert_eq!(entities, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_long_table_keeps_first_value() {
        let mut table = LongTable::default();
        let entity = EntityId::new("A");
        let date = NaiveDate::from_ymd_opt(2010, 1, 31).unwrap();
        table.insert(&entity, date, "x", FieldValue::Number(1.0));
        table.insert(&entity, date, "x", FieldValue::Number(2.0));
        let observations = table.into_observations();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].get("x"), Some(&FieldValue::Number(1.0)));
    }
}
