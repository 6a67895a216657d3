//! Conversion between [`Panel`] and polars [`DataFrame`].
//!
//! Frames carry the key as `BB_TICKER`, `year` and `month` columns followed by
//! the value columns. A value column whose non-null values are all numeric
//! becomes `Float64`; any other column becomes `String`.

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use panel_core::{CalendarPeriod, EntityId, FieldValue, PanelError, PanelRow, fields};

use crate::panel::Panel;

fn is_numeric(panel: &Panel, column: &str) -> bool {
    panel
        .rows()
        .iter()
        .filter_map(|r| r.get(column))
        .all(|v| matches!(v, FieldValue::Number(_)))
}

impl Panel {
    /// Converts the panel into a frame.
    ///
    /// # Errors
    /// Returns [`PanelError::Frame`] if polars rejects the columns.
    pub fn to_frame(&self) -> panel_core::Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns().len() + 3);
        columns.push(Column::new(
            fields::BB_TICKER.into(),
            self.rows()
                .iter()
                .map(|r| r.entity.as_str())
                .collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            fields::YEAR.into(),
            self.rows().iter().map(|r| r.period.year()).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            fields::MONTH.into(),
            self.rows()
                .iter()
                .map(|r| r.period.month() as i32)
                .collect::<Vec<_>>(),
        ));

        for name in self.columns() {
            let column = if is_numeric(self, name) {
                Column::new(name.as_str().into(), self.numeric(name))
            } else {
                let values: Vec<Option<String>> = self
                    .rows()
                    .iter()
                    .map(|r| r.get(name).map(ToString::to_string))
                    .collect();
                Column::new(name.as_str().into(), values)
            };
            columns.push(column);
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Reads a panel back from a frame written by [`Panel::to_frame`].
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] if a key column is absent and
    /// [`PanelError::InvalidRange`] for an invalid year or month.
    pub fn from_frame(frame: &DataFrame) -> panel_core::Result<Self> {
        let key = |name: &str| {
            frame
                .column(name)
                .map_err(|_| PanelError::MissingColumn(name.to_string()))
        };
        let tickers = key(fields::BB_TICKER)?.cast(&DataType::String)?;
        let tickers = tickers.str()?;
        let years = key(fields::YEAR)?.cast(&DataType::Int32)?;
        let years = years.i32()?;
        let months = key(fields::MONTH)?.cast(&DataType::Int32)?;
        let months = months.i32()?;

        let mut rows = Vec::with_capacity(frame.height());
        for i in 0..frame.height() {
            let (Some(ticker), Some(year), Some(month)) = (tickers.get(i), years.get(i), months.get(i))
            else {
                return Err(PanelError::Parse(format!("row {i} has a null key")));
            };
            let month = u32::try_from(month)
                .map_err(|_| PanelError::InvalidRange(format!("month {month} in row {i}")))?;
            rows.push(PanelRow::new(EntityId::new(ticker), CalendarPeriod::new(year, month)?));
        }

        let mut columns = Vec::new();
        for column in frame.get_columns() {
            let name = column.name().as_str();
            if [fields::BB_TICKER, fields::YEAR, fields::MONTH].contains(&name) {
                continue;
            }
            columns.push(name.to_string());
            if column.dtype() == &DataType::String {
                for (row, value) in rows.iter_mut().zip(column.str()?) {
                    row.set(name, value.map(|v| FieldValue::Text(v.to_string())));
                }
            } else {
                let values = column.cast(&DataType::Float64)?;
                for (row, value) in rows.iter_mut().zip(values.f64()?) {
                    row.set(name, value.filter(|v| v.is_finite()).map(FieldValue::Number));
                }
            }
        }
        debug!(rows = rows.len(), columns = columns.len(), "Read panel from frame");
        Ok(Self::with_columns(columns, rows))
    }
}

/// Writes a frame as CSV with a header row.
///
/// # Errors
/// Returns [`PanelError::Io`] if the file cannot be created and
/// [`PanelError::Frame`] if serialization fails.
pub fn write_csv(frame: &DataFrame, path: &Path) -> panel_core::Result<()> {
    let mut file = File::create(path)?;
    let mut frame = frame.clone();
    CsvWriter::new(&mut file).include_header(true).finish(&mut frame)?;
    debug!(path = %path.display(), rows = frame.height(), "Wrote CSV");
    Ok(())
}

/// Writes a frame as parquet.
///
/// # Errors
/// Returns [`PanelError::Io`] if the file cannot be created and
/// [`PanelError::Frame`] if serialization fails.
pub fn write_parquet(frame: &DataFrame, path: &Path) -> panel_core::Result<()> {
    let mut file = File::create(path)?;
    let mut frame = frame.clone();
    ParquetWriter::new(&mut file).finish(&mut frame)?;
    debug!(path = %path.display(), rows = frame.height(), "Wrote parquet");
    Ok(())
}
