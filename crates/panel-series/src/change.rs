//! Forward-looking rating changes.
//!
//! The change attributed to period `t` is `rating[t + 1] - rating[t]`; the last
//! period of an entity has no change. Differences never cross an entity boundary.

use tracing::debug;

use panel_core::{FieldValue, PanelError, PanelRow, Result};

/// Forward differences of one entity's chronologically ordered ratings.
///
/// A missing rating makes both adjacent changes absent.
#[must_use]
pub fn forward_changes(ratings: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut changes: Vec<Option<f64>> = ratings
        .windows(2)
        .map(|w| match (w[0], w[1]) {
            (Some(current), Some(next)) => Some(next - current),
            _ => None,
        })
        .collect();
    if !ratings.is_empty() {
        changes.push(None);
    }
    changes
}

/// Writes the forward change of `rating_field` into `change_field` for every row.
///
/// Rows are sorted by (entity, period) first; each entity is differenced on its
/// own so the last row of every entity gets no change.
///
/// # Errors
/// Returns [`PanelError::NonChronological`] if an entity has two rows for the same period.
pub fn annotate_changes(
    rows: &mut [PanelRow],
    rating_field: &str,
    change_field: &str,
) -> Result<()> {
    rows.sort_by(|a, b| a.entity.cmp(&b.entity).then(a.period.cmp(&b.period)));

    let mut start = 0;
    while start < rows.len() {
        let entity = rows[start].entity.clone();
        let end = rows[start..]
            .iter()
            .position(|r| r.entity != entity)
            .map_or(rows.len(), |offset| start + offset);
        let group = &mut rows[start..end];

        if let Some(w) = group.windows(2).find(|w| w[0].period == w[1].period) {
            return Err(PanelError::NonChronological {
                entity: entity.to_string(),
                date: w[1].period.to_string(),
            });
        }

        let ratings: Vec<Option<f64>> = group.iter().map(|r| r.number(rating_field)).collect();
        for (row, change) in group.iter_mut().zip(forward_changes(&ratings)) {
            row.set(change_field, change.map(FieldValue::Number));
        }
        debug!(entity = %entity, rows = group.len(), "Annotated rating changes");
        start = end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::{CalendarPeriod, EntityId};
    use rstest::rstest;

    fn row(entity: &str, month: u32, rating: f64) -> PanelRow {
        PanelRow::new(EntityId::new(entity), CalendarPeriod::new(2010, month).unwrap())
            .with_value("ordinal_rating", rating)
    }

    #[rstest]
    #[case(&[], &[])]
    #[case(&[Some(3.0)], &[None])]
    #[case(
        &[Some(7.0), Some(7.0), Some(9.0), Some(9.0), Some(5.0)],
        &[Some(0.0), Some(2.0), Some(0.0), Some(-4.0), None]
    )]
    #[case(&[Some(3.0), None, Some(4.0)], &[None, None, None])]
    fn test_forward_changes(#[case] ratings: &[Option<f64>], #[case] expected: &[Option<f64>]) {
        assert_eq!(forward_changes(ratings), expected);
    }

    #[test]
    fn test_annotate_never_crosses_entities() {
        let mut rows = vec![
            row("B", 1, 10.0),
            row("A", 2, 12.0),
            row("A", 1, 13.0),
            row("B", 2, 8.0),
        ];
        annotate_changes(&mut rows, "ordinal_rating", "CREDIT_RTG_CHANGE").unwrap();
        let changes: Vec<_> = rows.iter().map(|r| r.number("CREDIT_RTG_CHANGE")).collect();
        assert_eq!(changes, vec![Some(-1.0), None, Some(-2.0), None]);
        assert_eq!(rows[0].entity.as_str(), "A");
    }

    #[test]
    fn test_annotate_rejects_duplicate_periods() {
        let mut rows = vec![row("A", 1, 10.0), row("A", 1, 11.0)];
        assert!(annotate_changes(&mut rows, "ordinal_rating", "chg").is_err());
    }
}
