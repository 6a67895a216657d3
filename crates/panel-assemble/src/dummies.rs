//! Indicator columns for fixed effects.
//!
//! One column per category except the first in sorted order, which is the
//! reference level. Values are `1.0` or `0.0`; rows with no category get `0.0`
//! in every column of the family.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use panel_core::{FieldValue, PanelRow, Result, fields};

use crate::panel::Panel;

/// A family of dummy columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DummyKind {
    /// One column per calendar year.
    Year,
    /// One column per industry.
    Industry,
    /// One column per country.
    Country,
}

impl DummyKind {
    /// Column name prefix of the family.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Year => fields::YEAR_DUMMY_PREFIX,
            Self::Industry => fields::INDUSTRY_DUMMY_PREFIX,
            Self::Country => fields::COUNTRY_DUMMY_PREFIX,
        }
    }

    fn category(&self, row: &PanelRow) -> Option<String> {
        match self {
            Self::Year => Some(row.period.year().to_string()),
            Self::Industry => row.text(fields::INDUSTRY).map(str::to_string),
            Self::Country => row.text(fields::COUNTRY).map(str::to_string),
        }
    }
}

/// Appends one dummy column per non-reference category; returns their names.
///
/// Row order is unchanged.
///
/// # Errors
/// Returns [`panel_core::PanelError::ColumnConflict`] if a dummy column already exists.
pub fn add_dummies(panel: &mut Panel, kind: DummyKind) -> Result<Vec<String>> {
    let categories: BTreeSet<String> = panel.rows().iter().filter_map(|r| kind.category(r)).collect();
    let names: Vec<(String, String)> = categories
        .into_iter()
        .skip(1)
        .map(|c| (format!("{}{c}", kind.prefix()), c))
        .collect();

    for (name, _) in &names {
        panel.add_column(name.as_str())?;
    }
    for row in panel.rows_mut() {
        let category = kind.category(row);
        for (name, value) in &names {
            let flag = if category.as_deref() == Some(value.as_str()) {
                1.0
            } else {
                0.0
            };
            row.set(name.as_str(), Some(FieldValue::Number(flag)));
        }
    }
    Ok(names.into_iter().map(|(name, _)| name).collect())
}

/// Names of dummy columns of a family present in the panel.
#[must_use]
pub fn dummy_columns(panel: &Panel, kind: DummyKind) -> Vec<String> {
    panel
        .columns()
        .iter()
        .filter(|c| c.starts_with(kind.prefix()))
        .cloned()
        .collect()
}
