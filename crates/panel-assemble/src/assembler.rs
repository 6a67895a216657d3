//! Joining per-source tables into one panel and filtering it.
//!
//! [`PanelAssembler`] starts from a spine table, joins further sources on
//! (entity, period), attaches company classification, then applies the
//! completeness gate and the not-rated exclusion. Dummies are derived last.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

use panel_core::{
    CalendarPeriod, EntityId, EntityProfile, FieldValue, FilterReport, PanelError, PanelRow,
    Result, fields,
};

use crate::dummies::{DummyKind, add_dummies};
use crate::panel::Panel;

/// How rows without a partner are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep every left row, in order.
    #[default]
    Left,
    /// Keep rows from both sides, ordered by (entity, period).
    Outer,
}

/// Joins two panels on (entity, period).
///
/// # Errors
/// Returns [`PanelError::ColumnConflict`] if both sides carry a column of the
/// same name, and [`PanelError::InvalidParameter`] if the right side has two
/// rows for one key.
pub fn join(left: &Panel, right: &Panel, kind: JoinKind) -> Result<Panel> {
    if let Some(conflict) = right.columns().iter().find(|c| left.has_column(c)) {
        return Err(PanelError::ColumnConflict(conflict.clone()));
    }
    let mut index: HashMap<(&EntityId, CalendarPeriod), &PanelRow> =
        HashMap::with_capacity(right.len());
    for row in right.rows() {
        if index.insert((&row.entity, row.period), row).is_some() {
            return Err(PanelError::InvalidParameter(format!(
                "duplicate key ({}, {}) on the right side of a join",
                row.entity, row.period
            )));
        }
    }

    let mut columns = left.columns().to_vec();
    columns.extend(right.columns().iter().cloned());

    let merge = |row: &PanelRow| {
        let mut merged = row.clone();
        if let Some(partner) = index.get(&(&row.entity, row.period)) {
            merged
                .values
                .extend(partner.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    };

    let rows = match kind {
        JoinKind::Left => left.rows().iter().map(merge).collect(),
        JoinKind::Outer => {
            let mut keyed: BTreeMap<(EntityId, CalendarPeriod), PanelRow> = right
                .rows()
                .iter()
                .map(|r| ((r.entity.clone(), r.period), r.clone()))
                .collect();
            for row in left.rows() {
                keyed.insert((row.entity.clone(), row.period), merge(row));
            }
            keyed.into_values().collect()
        }
    };
    Ok(Panel::with_columns(columns, rows))
}

/// Attaches industry and country from company profiles.
///
/// # Errors
/// Returns [`PanelError::ColumnConflict`] if the panel already has either column.
pub fn join_profiles(panel: &Panel, profiles: &[EntityProfile]) -> Result<Panel> {
    let lookup: HashMap<&EntityId, &EntityProfile> =
        profiles.iter().map(|p| (&p.entity, p)).collect();
    let mut joined = panel.clone();
    joined.add_column(fields::INDUSTRY)?;
    joined.add_column(fields::COUNTRY)?;
    for row in joined.rows_mut() {
        let profile = lookup.get(&row.entity);
        row.set(
            fields::INDUSTRY,
            profile.and_then(|p| p.industry.clone()).map(FieldValue::Text),
        );
        row.set(
            fields::COUNTRY,
            profile.and_then(|p| p.country.clone()).map(FieldValue::Text),
        );
    }
    Ok(joined)
}

/// Drops rows whose ordinal rating is the not-rated sentinel `0`.
///
/// Rows with a null rating are kept; the completeness gate handles them.
#[must_use]
pub fn exclude_not_rated(panel: &Panel, rating_column: &str) -> (Panel, usize) {
    let kept = panel.filter(|r| r.number(rating_column) != Some(0.0));
    let dropped = panel.len() - kept.len();
    debug!(dropped, "Excluded not-rated rows");
    (kept, dropped)
}

/// Builds a regression panel from a spine and further sources.
#[derive(Debug)]
pub struct PanelAssembler {
    name: String,
    panel: Panel,
    required: Vec<String>,
    rating_column: Option<String>,
    dummies: Vec<DummyKind>,
}

impl PanelAssembler {
    /// Starts from a spine table.
    #[must_use]
    pub fn new(name: impl Into<String>, spine: Panel) -> Self {
        Self {
            name: name.into(),
            panel: spine,
            required: Vec::new(),
            rating_column: None,
            dummies: Vec::new(),
        }
    }

    /// Left-joins another source.
    ///
    /// # Errors
    /// See [`join`].
    pub fn left_join(mut self, other: &Panel) -> Result<Self> {
        self.panel = join(&self.panel, other, JoinKind::Left)?;
        Ok(self)
    }

    /// Outer-joins another source.
    ///
    /// # Errors
    /// See [`join`].
    pub fn outer_join(mut self, other: &Panel) -> Result<Self> {
        self.panel = join(&self.panel, other, JoinKind::Outer)?;
        Ok(self)
    }

    /// Attaches industry and country.
    ///
    /// # Errors
    /// See [`join_profiles`].
    pub fn with_profiles(mut self, profiles: &[EntityProfile]) -> Result<Self> {
        self.panel = join_profiles(&self.panel, profiles)?;
        Ok(self)
    }

    /// Columns that must be non-null for a row to survive.
    #[must_use]
    pub fn require(mut self, columns: &[&str]) -> Self {
        self.required
            .extend(columns.iter().map(|c| (*c).to_string()));
        self
    }

    /// Excludes rows whose rating in `column` is `NR`.
    #[must_use]
    pub fn exclude_not_rated(mut self, column: &str) -> Self {
        self.rating_column = Some(column.to_string());
        self
    }

    /// Dummy families to derive, in column order.
    #[must_use]
    pub fn dummies(mut self, kinds: &[DummyKind]) -> Self {
        self.dummies.extend_from_slice(kinds);
        self
    }

    /// Applies a transformation to the joined panel before filtering.
    ///
    /// # Errors
    /// Propagates the error of `f`.
    pub fn map(mut self, f: impl FnOnce(Panel) -> Result<Panel>) -> Result<Self> {
        self.panel = f(self.panel)?;
        Ok(self)
    }

    /// Filters and derives dummies.
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] if a required column was never joined.
    #[instrument(skip(self), fields(table = %self.name))]
    pub fn assemble(self) -> Result<(Panel, FilterReport)> {
        let required: Vec<&str> = self.required.iter().map(String::as_str).collect();
        self.panel.require_columns(&required)?;

        let mut report = FilterReport {
            rows_in: self.panel.len(),
            ..Default::default()
        };
        let (panel, incomplete) = self.panel.drop_incomplete(&required);
        report.incomplete = incomplete;

        let panel = match &self.rating_column {
            Some(column) => {
                let (panel, not_rated) = exclude_not_rated(&panel, column);
                report.not_rated = not_rated;
                panel
            }
            None => panel,
        };

        let mut panel = panel;
        for kind in &self.dummies {
            let added = add_dummies(&mut panel, *kind)?;
            debug!(kind = ?kind, columns = added.len(), "Added dummies");
        }

        report.log(&self.name);
        info!(rows = panel.len(), columns = panel.columns().len(), "Assembled panel");
        Ok((panel, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entity: &str, month: u32) -> PanelRow {
        PanelRow::new(EntityId::new(entity), CalendarPeriod::new(2010, month).unwrap())
    }

    fn esg() -> Panel {
        Panel::from_rows(vec![
            row("A", 1).with_value("TRESGS", 50.0),
            row("A", 2).with_value("TRESGS", 51.0),
            row("B", 1).with_value("TRESGS", 70.0),
        ])
    }

    fn ratings() -> Panel {
        Panel::from_rows(vec![
            row("A", 1).with_value("ordinal_rating", 14.0),
            row("B", 1).with_value("ordinal_rating", 0.0),
            row("C", 1).with_value("ordinal_rating", 9.0),
        ])
    }

    #[test]
    fn test_left_join_preserves_order() {
        let joined = join(&esg(), &ratings(), JoinKind::Left).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.columns(), ["TRESGS", "ordinal_rating"]);
        assert_eq!(
            joined.numeric("ordinal_rating"),
            vec![Some(14.0), None, Some(0.0)]
        );
    }

    #[test]
    fn test_outer_join_keeps_both_sides() {
        let joined = join(&esg(), &ratings(), JoinKind::Outer).unwrap();
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.rows()[3].entity.as_str(), "C");
    }

    #[test]
    fn test_join_rejects_conflicts() {
        assert!(matches!(
            join(&esg(), &esg(), JoinKind::Left),
            Err(PanelError::ColumnConflict(_))
        ));
    }

    #[test]
    fn test_assemble_gate_and_not_rated() {
        let profiles = vec![
            EntityProfile::new(EntityId::new("A"))
                .with_industry("Utility")
                .with_country("FRANCE"),
            EntityProfile::new(EntityId::new("B"))
                .with_industry("Energy")
                .with_country("SPAIN"),
        ];
        let (panel, report) = PanelAssembler::new("h1", esg())
            .left_join(&ratings())
            .unwrap()
            .with_profiles(&profiles)
            .unwrap()
            .require(&["TRESGS", "ordinal_rating", "INDUSTRY", "COUNTRY"])
            .exclude_not_rated("ordinal_rating")
            .assemble()
            .unwrap();
        assert_eq!(report.rows_in, 3);
        assert_eq!(report.incomplete, 1);
        assert_eq!(report.not_rated, 1);
        assert_eq!(panel.len(), 1);
        assert_eq!(panel.rows()[0].text("INDUSTRY"), Some("Utility"));
    }

    #[test]
    fn test_assemble_missing_required_column() {
        let result = PanelAssembler::new("h1", esg())
            .require(&["SIZE"])
            .assemble();
        assert!(matches!(result, Err(PanelError::MissingColumn(_))));
    }
}
