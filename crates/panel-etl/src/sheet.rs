//! Raw spreadsheet grids.
//!
//! Vendor exports are wide sheets with several header rows, so they are read
//! without a header and without type inference: every cell stays text until a
//! transform decides what it is.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

use panel_core::{PanelError, Result};

/// Date layouts found in the exports.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// A rectangular grid of optional text cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawSheet {
    name: String,
    rows: Vec<Vec<Option<String>>>,
}

impl RawSheet {
    /// Builds a sheet from rows; short rows are padded with empty cells.
    #[must_use]
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Builds a sheet from string literals; blank strings become empty cells.
    #[must_use]
    pub fn from_text<S: AsRef<str>>(name: impl Into<String>, rows: &[Vec<S>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| normalize(cell.as_ref())).collect())
            .collect();
        Self::new(name, rows)
    }

    /// Reads a header-less grid from a frame whose columns are all text.
    ///
    /// # Errors
    /// Returns [`PanelError::Frame`] if a column cannot be cast to text.
    pub fn from_frame(name: impl Into<String>, frame: &DataFrame) -> Result<Self> {
        let mut rows = vec![Vec::with_capacity(frame.width()); frame.height()];
        for column in frame.get_columns() {
            let text = column.cast(&DataType::String)?;
            for (row, cell) in rows.iter_mut().zip(text.str()?) {
                row.push(cell.and_then(normalize));
            }
        }
        Ok(Self::new(name, rows))
    }

    /// Reads a CSV export; the sheet is named after the file stem.
    ///
    /// # Errors
    /// Returns [`PanelError::Io`] if the file is missing and
    /// [`PanelError::Frame`] if it cannot be parsed.
    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PanelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }
        let frame = CsvReadOptions::default()
            .with_has_header(false)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(sheet = %name, rows = frame.height(), columns = frame.width(), "Read raw sheet");
        Self::from_frame(name, &frame)
    }

    /// Sheet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// A row by index.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// A cell by position; `None` when empty or out of range.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Rows from `start` onwards.
    pub fn rows_from(&self, start: usize) -> impl Iterator<Item = (usize, &[Option<String>])> {
        self.rows
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, row)| (i, row.as_slice()))
    }

    /// Position of a name in the first row.
    #[must_use]
    pub fn header_position(&self, name: &str) -> Option<usize> {
        self.row(0)?
            .iter()
            .position(|cell| cell.as_deref() == Some(name))
    }

    /// Interprets the first row as a header and returns column positions by name.
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] for the first name not in the header.
    pub fn header_positions(&self, names: &[&str]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.header_position(name).ok_or_else(|| {
                    PanelError::MissingColumn(format!("{name} in {}", self.name))
                })
            })
            .collect()
    }

    /// Parses a date cell of this sheet.
    ///
    /// # Errors
    /// Returns [`PanelError::MalformedDate`] if no known layout matches.
    pub fn parse_date(&self, raw: &str) -> Result<NaiveDate> {
        parse_date(raw).ok_or_else(|| PanelError::MalformedDate {
            sheet: self.name.clone(),
            value: raw.to_string(),
        })
    }

    /// Parses the date of one data row; a malformed date is logged with the
    /// row and its `key` and the row is skipped by returning `None`.
    #[must_use]
    pub fn row_date(&self, row: usize, key: &str, raw: &str) -> Option<NaiveDate> {
        match self.parse_date(raw) {
            Ok(date) => Some(date),
            Err(error) => {
                warn!(sheet = %self.name, row, key, error = %error, "Skipped row with malformed date");
                None
            }
        }
    }
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses the date layouts used by the exports, with or without a time part.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
