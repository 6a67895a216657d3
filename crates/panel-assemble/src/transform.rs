//! Sub-sample slicing, lagging and winsorizing of panels.
//!
//! Every slice can leave dummies constant, so callers follow a slice with
//! [`Panel::drop_constant_columns`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use panel_core::{FieldValue, PanelError, Result};

use crate::panel::Panel;

/// Which tail of a size distribution to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantileTail {
    /// Rows at or above the upper quantile.
    Top,
    /// Rows at or below the lower quantile.
    Bottom,
}

/// Linearly interpolated quantile of the non-null values, `q` in `[0, 1]`.
#[must_use]
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

impl Panel {
    /// Rows whose period year lies in `from..=to`.
    #[must_use]
    pub fn slice_years(&self, from: i32, to: i32) -> Self {
        self.filter(|r| (from..=to).contains(&r.period.year()))
    }

    /// Rows whose text column equals `value`.
    #[must_use]
    pub fn slice_text(&self, column: &str, value: &str) -> Self {
        self.filter(|r| r.text(column) == Some(value))
    }

    /// Rows in the top or bottom `share` of a numeric column.
    ///
    /// `Top` with share 0.25 keeps values at or above the 75th percentile.
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] for an unknown column and
    /// [`PanelError::InvalidParameter`] for a share outside `(0, 1]` or a column
    /// without numeric values.
    pub fn slice_quantile(&self, column: &str, tail: QuantileTail, share: f64) -> Result<Self> {
        self.require_columns(&[column])?;
        if !(share > 0.0 && share <= 1.0) {
            return Err(PanelError::InvalidParameter(format!(
                "quantile share {share} outside (0, 1]"
            )));
        }
        let q = match tail {
            QuantileTail::Top => 1.0 - share,
            QuantileTail::Bottom => share,
        };
        let cutoff = quantile(&self.numeric(column), q).ok_or_else(|| {
            PanelError::InvalidParameter(format!("{column} has no numeric values"))
        })?;
        debug!(column, ?tail, cutoff, "Quantile slice");
        Ok(self.filter(|r| match (r.number(column), tail) {
            (Some(v), QuantileTail::Top) => v >= cutoff,
            (Some(v), QuantileTail::Bottom) => v <= cutoff,
            (None, _) => false,
        }))
    }

    /// Shifts columns down by a number of rows within each entity.
    ///
    /// Rows are sorted by (entity, period) first. The first `n` rows of every
    /// entity become null for a column lagged by `n`.
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] for unknown columns.
    pub fn lag(&self, lags: &[(&str, usize)]) -> Result<Self> {
        let names: Vec<&str> = lags.iter().map(|(name, _)| *name).collect();
        self.require_columns(&names)?;

        let mut lagged = self.clone();
        lagged.sort();
        let original = lagged.clone();
        let mut position: HashMap<&panel_core::EntityId, usize> = HashMap::new();
        let mut offsets = Vec::with_capacity(original.len());
        for row in original.rows() {
            let index = position.entry(&row.entity).or_insert(0);
            offsets.push(*index);
            *index += 1;
        }

        for (i, row) in lagged.rows_mut().iter_mut().enumerate() {
            for (name, n) in lags {
                let value = if offsets[i] >= *n {
                    original.rows()[i - n].get(name).cloned()
                } else {
                    None
                };
                row.set(*name, value);
            }
        }
        Ok(lagged)
    }

    /// Clamps the extreme values of a numeric column.
    ///
    /// With `n` non-null values, the lowest `floor(lower * n)` are replaced by
    /// the next smallest value and the highest `floor(upper * n)` by the next
    /// largest one.
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] for an unknown column and
    /// [`PanelError::InvalidParameter`] for limits outside `[0, 0.5)`.
    pub fn winsorize(&self, column: &str, lower: f64, upper: f64) -> Result<Self> {
        self.require_columns(&[column])?;
        if !(0.0..0.5).contains(&lower) || !(0.0..0.5).contains(&upper) {
            return Err(PanelError::InvalidParameter(format!(
                "winsorize limits ({lower}, {upper}) outside [0, 0.5)"
            )));
        }
        let values = self.numeric(column);
        let mut order: Vec<usize> = (0..values.len()).filter(|i| values[*i].is_some()).collect();
        order.sort_by(|a, b| values[*a].unwrap_or_default().total_cmp(&values[*b].unwrap_or_default()));
        let n = order.len();
        if n == 0 {
            return Ok(self.clone());
        }
        let low_count = (lower * n as f64) as usize;
        let high_start = n - (upper * n as f64) as usize;
        let low_value = values[order[low_count.min(n - 1)]];
        let high_value = values[order[high_start.saturating_sub(1)]];

        let mut result = self.clone();
        let rows = result.rows_mut();
        for &i in &order[..low_count] {
            rows[i].set(column, low_value.map(FieldValue::Number));
        }
        for &i in &order[high_start..] {
            rows[i].set(column, high_value.map(FieldValue::Number));
        }
        debug!(column, clamped_low = low_count, clamped_high = n - high_start, "Winsorized");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use panel_core::{CalendarPeriod, EntityId, PanelRow};

    fn row(entity: &str, year: i32, month: u32) -> PanelRow {
        PanelRow::new(EntityId::new(entity), CalendarPeriod::new(year, month).unwrap())
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let values: Vec<Option<f64>> = vec![Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)];
        assert_relative_eq!(quantile(&values, 0.75).unwrap(), 3.25);
        assert_relative_eq!(quantile(&values, 0.25).unwrap(), 1.75);
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert!(quantile(&[None], 0.5).is_none());
    }

    #[test]
    fn test_slice_quantile_tails() {
        let panel = Panel::from_rows(
            (1..=8)
                .map(|m| row("A", 2010, m).with_value("SIZE", f64::from(m)))
                .collect(),
        );
        let top = panel.slice_quantile("SIZE", QuantileTail::Top, 0.25).unwrap();
        assert_eq!(top.numeric("SIZE"), vec![Some(7.0), Some(8.0)]);
        let bottom = panel
            .slice_quantile("SIZE", QuantileTail::Bottom, 0.25)
            .unwrap();
        assert_eq!(bottom.numeric("SIZE"), vec![Some(1.0), Some(2.0)]);
        assert!(panel.slice_quantile("SIZE", QuantileTail::Top, 0.0).is_err());
    }

    #[test]
    fn test_slice_years_and_text() {
        let panel = Panel::from_rows(vec![
            row("A", 2006, 1).with_value("INDUSTRY", "Utility"),
            row("A", 2013, 1).with_value("INDUSTRY", "Utility"),
            row("B", 2013, 1).with_value("INDUSTRY", "Energy"),
        ]);
        assert_eq!(panel.slice_years(2013, 2019).len(), 2);
        assert_eq!(panel.slice_text("INDUSTRY", "Utility").len(), 2);
    }

    #[test]
    fn test_lag_is_per_entity() {
        let panel = Panel::from_rows(vec![
            row("B", 2010, 1).with_value("x", 10.0),
            row("A", 2010, 1).with_value("x", 1.0),
            row("A", 2010, 2).with_value("x", 2.0),
            row("A", 2010, 3).with_value("x", 3.0),
            row("B", 2010, 2).with_value("x", 20.0),
        ]);
        let lagged = panel.lag(&[("x", 1)]).unwrap();
        assert_eq!(
            lagged.numeric("x"),
            vec![None, Some(1.0), Some(2.0), None, Some(10.0)]
        );
        assert!(panel.lag(&[("nope", 1)]).is_err());
    }

    #[test]
    fn test_winsorize_clamps_tails() {
        let panel = Panel::from_rows(
            (1..=10)
                .map(|m| row("A", 2010, m).with_value("OPER_MARGIN", f64::from(m)))
                .collect(),
        );
        let clamped = panel.winsorize("OPER_MARGIN", 0.1, 0.1).unwrap();
        let values: Vec<f64> = clamped.numeric("OPER_MARGIN").into_iter().flatten().collect();
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[9], 9.0);
        assert_relative_eq!(values[4], 5.0);

        let untouched = panel.winsorize("OPER_MARGIN", 0.01, 0.01).unwrap();
        assert_eq!(untouched, panel);
    }
}
