//! Year-end collapse of monthly rows.

use std::collections::BTreeMap;

use panel_core::{CalendarPeriod, EntityId, PanelRow, Result};

/// Keeps the latest row of each (entity, year) and re-keys it to December.
///
/// Re-keying lets yearly tables join on (entity, period) like monthly ones.
///
/// # Errors
/// Never fails for rows built from valid periods.
pub fn year_end(rows: &[PanelRow]) -> Result<Vec<PanelRow>> {
    let mut latest: BTreeMap<(EntityId, i32), &PanelRow> = BTreeMap::new();
    for row in rows {
        let key = (row.entity.clone(), row.period.year());
        match latest.get(&key) {
            Some(existing) if existing.period >= row.period => {}
            _ => {
                latest.insert(key, row);
            }
        }
    }
    latest
        .into_iter()
        .map(|((entity, year), row)| {
            Ok(PanelRow {
                entity,
                period: CalendarPeriod::new(year, 12)?,
                values: row.values.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_end_keeps_latest_month() {
        let rows = vec![
            PanelRow::new(EntityId::new("A"), CalendarPeriod::new(2010, 3).unwrap())
                .with_value("v", 1.0),
            PanelRow::new(EntityId::new("A"), CalendarPeriod::new(2010, 11).unwrap())
                .with_value("v", 2.0),
            PanelRow::new(EntityId::new("A"), CalendarPeriod::new(2010, 6).unwrap())
                .with_value("v", 3.0),
            PanelRow::new(EntityId::new("A"), CalendarPeriod::new(2011, 1).unwrap())
                .with_value("v", 4.0),
        ];
        let yearly = year_end(&rows).unwrap();
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].number("v"), Some(2.0));
        assert_eq!(yearly[0].period, CalendarPeriod::new(2010, 12).unwrap());
        assert_eq!(yearly[1].number("v"), Some(4.0));
    }
}
