//! Row-oriented panel table keyed by (entity, period).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use panel_core::{EntityId, FieldValue, PanelError, PanelRow, Result};

/// A table of (entity, period) rows with an ordered set of value columns.
///
/// The key columns are implicit; `columns` lists value columns only. A value
/// absent from a row is null.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    columns: Vec<String>,
    rows: Vec<PanelRow>,
}

impl Panel {
    /// Creates an empty panel with the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Creates a panel from rows, taking the sorted union of their value names as columns.
    #[must_use]
    pub fn from_rows(rows: Vec<PanelRow>) -> Self {
        let columns: BTreeSet<&String> = rows.iter().flat_map(|r| r.values.keys()).collect();
        let columns = columns.into_iter().cloned().collect();
        Self { columns, rows }
    }

    /// Creates a panel from rows with an explicit column order.
    ///
    /// Values whose name is not listed are dropped.
    #[must_use]
    pub fn with_columns(columns: Vec<String>, mut rows: Vec<PanelRow>) -> Self {
        let keep: HashSet<&str> = columns.iter().map(String::as_str).collect();
        for row in &mut rows {
            row.values.retain(|name, _| keep.contains(name.as_str()));
        }
        Self { columns, rows }
    }

    /// Value column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the panel has a value column named `name`.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }

    /// Mutable access to rows.
    pub fn rows_mut(&mut self) -> &mut [PanelRow] {
        &mut self.rows
    }

    /// Consumes the panel and returns its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<PanelRow> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a value column.
    ///
    /// # Errors
    /// Returns [`PanelError::ColumnConflict`] if the column already exists.
    pub fn add_column(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(PanelError::ColumnConflict(name));
        }
        self.columns.push(name);
        Ok(())
    }

    /// Fails with [`PanelError::MissingColumn`] unless every name is a column.
    ///
    /// # Errors
    /// Returns the first missing column.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|n| !self.has_column(n)) {
            Some(missing) => Err(PanelError::MissingColumn((*missing).to_string())),
            None => Ok(()),
        }
    }

    /// Keeps only the listed columns, in the listed order.
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] for unknown names.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        self.require_columns(names)?;
        let columns = names.iter().map(|n| (*n).to_string()).collect();
        Ok(Self::with_columns(columns, self.rows.clone()))
    }

    /// Removes columns by name; unknown names are ignored.
    #[must_use]
    pub fn drop_columns(mut self, names: &[String]) -> Self {
        let drop: HashSet<&str> = names.iter().map(String::as_str).collect();
        self.columns.retain(|c| !drop.contains(c.as_str()));
        for row in &mut self.rows {
            row.values.retain(|name, _| !drop.contains(name.as_str()));
        }
        self
    }

    /// Keeps rows matching a predicate, preserving order.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&PanelRow) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Values of a column, one per row.
    #[must_use]
    pub fn column(&self, name: &str) -> Vec<Option<&FieldValue>> {
        self.rows.iter().map(|r| r.get(name)).collect()
    }

    /// Numeric values of a column, one per row; text and nulls are `None`.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.number(name)).collect()
    }

    /// Distinct entities in first-seen order.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(&r.entity))
            .map(|r| r.entity.clone())
            .collect()
    }

    /// Sorts rows by (entity, period); the sort is stable.
    pub fn sort(&mut self) {
        self.rows
            .sort_by(|a, b| a.entity.cmp(&b.entity).then(a.period.cmp(&b.period)));
    }

    /// Drops every row with a null in any of `required`. All or nothing per row.
    ///
    /// Returns the filtered panel and the number of rows dropped. Applying the
    /// gate twice drops nothing the second time.
    #[must_use]
    pub fn drop_incomplete(&self, required: &[&str]) -> (Self, usize) {
        let kept = self.filter(|r| required.iter().all(|name| r.get(name).is_some()));
        let dropped = self.len() - kept.len();
        debug!(dropped, required = ?required, "Completeness gate");
        (kept, dropped)
    }

    /// Columns holding a single value (nulls included) across all rows.
    #[must_use]
    pub fn constant_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|name| {
                let mut values = self.rows.iter().map(|r| r.get(name));
                match values.next() {
                    Some(first) => values.all(|v| v == first),
                    None => true,
                }
            })
            .cloned()
            .collect()
    }

    /// Removes constant columns, except those listed in `keep`.
    ///
    /// Returns the reduced panel and the dropped column names.
    #[must_use]
    pub fn drop_constant_columns(self, keep: &[&str]) -> (Self, Vec<String>) {
        let dropped: Vec<String> = self
            .constant_columns()
            .into_iter()
            .filter(|c| !keep.contains(&c.as_str()))
            .collect();
        if !dropped.is_empty() {
            debug!(dropped = ?dropped, "Dropped constant columns");
        }
        (self.drop_columns(&dropped), dropped)
    }

    /// Appends rows from another panel with identical columns.
    ///
    /// # Errors
    /// Returns [`PanelError::InvalidParameter`] if the column lists differ.
    pub fn append(&mut self, other: Self) -> Result<()> {
        if self.columns != other.columns {
            return Err(PanelError::InvalidParameter(
                "cannot append panels with different columns".to_string(),
            ));
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}
