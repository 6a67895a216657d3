//! Core data types for the ESG and credit rating panel.
//!
//! This module defines the fundamental data structures:
//!
//! - [`EntityId`] - Company key (Bloomberg fundamental ticker)
//! - [`CalendarPeriod`] - A (year, month) reporting period
//! - [`FieldValue`] / [`Record`] - Named numeric or text values
//! - [`EntityObservation`] - A dated vendor observation for one company
//! - [`PanelRow`] - One (entity, period) row of an aligned table
//! - [`EntityProfile`] - Company reference information

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{PanelError, Result};

/// A company key.
///
/// Keys are trimmed and uppercased on creation so vendor spellings agree.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new entity key, trimming and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the key is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A monthly reporting period.
///
/// Ordered by year, then month. Construction validates the month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarPeriod {
    year: i32,
    month: u32,
}

impl CalendarPeriod {
    /// Creates a period, failing with [`PanelError::InvalidRange`] for a month
    /// outside `1..=12` or a year chrono cannot represent.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(PanelError::InvalidRange(format!(
                "{year}-{month:02} is not a calendar month"
            )));
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month of year, `1..=12`.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Months elapsed since year zero; consecutive periods differ by one.
    #[must_use]
    pub const fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// The following month.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the period.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl fmt::Display for CalendarPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for CalendarPeriod {
    type Err = PanelError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| PanelError::InvalidRange(format!("expected YYYY-MM, got {s:?}")))?;
        let year = year
            .parse()
            .map_err(|_| PanelError::InvalidRange(format!("invalid year in {s:?}")))?;
        let month = month
            .parse()
            .map_err(|_| PanelError::InvalidRange(format!("invalid month in {s:?}")))?;
        Self::new(year, month)
    }
}

/// A single cell value. Missing values are represented by absence from a [`Record`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric value.
    Number(f64),
    /// Text value (ratings symbols, classifications).
    Text(String),
}

impl FieldValue {
    /// Interprets a raw spreadsheet cell.
    ///
    /// Empty cells and vendor placeholders (`#N/A`, `NA`, `NaN`) yield `None`,
    /// numeric text becomes [`FieldValue::Number`], anything else is kept as text.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with("#N/A") || raw == "NA" || raw.eq_ignore_ascii_case("nan")
        {
            return None;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(Self::Number(v)),
            _ => Some(Self::Text(raw.to_string())),
        }
    }

    /// Returns the numeric value, if any.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Returns the text value, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Named field values of one observation or row.
pub type Record = BTreeMap<String, FieldValue>;

/// A dated vendor observation for one company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityObservation {
    /// Company key.
    pub entity: EntityId,
    /// Reporting date.
    pub date: NaiveDate,
    /// Observed fields; absent fields are missing.
    pub fields: Record,
}

impl EntityObservation {
    /// Creates an observation with no fields.
    #[must_use]
    pub const fn new(entity: EntityId, date: NaiveDate) -> Self {
        Self {
            entity,
            date,
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The reporting period of this observation.
    #[must_use]
    pub fn period(&self) -> CalendarPeriod {
        CalendarPeriod::from_date(self.date)
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// One (entity, period) row of an aligned table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    /// Company key.
    pub entity: EntityId,
    /// Reporting period.
    pub period: CalendarPeriod,
    /// Named values; absent names are null.
    pub values: Record,
}

impl PanelRow {
    /// Creates a row with no values.
    #[must_use]
    pub const fn new(entity: EntityId, period: CalendarPeriod) -> Self {
        Self {
            entity,
            period,
            values: BTreeMap::new(),
        }
    }

    /// Sets a value.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Returns a value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Returns a numeric value by name.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(FieldValue::as_number)
    }

    /// Returns a text value by name.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(FieldValue::as_text)
    }

    /// Sets or clears a value.
    pub fn set(&mut self, name: impl Into<String>, value: Option<FieldValue>) {
        let name = name.into();
        match value {
            Some(v) => {
                self.values.insert(name, v);
            }
            None => {
                self.values.remove(&name);
            }
        }
    }
}

/// Company reference information.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityProfile {
    /// Company key.
    pub entity: EntityId,
    /// Company name.
    pub name: Option<String>,
    /// ISIN, used to map Refinitiv exports.
    pub isin: Option<String>,
    /// Rating supervisor company id, used to map the S&P feed.
    pub company_id: Option<String>,
    /// Industry classification.
    pub industry: Option<String>,
    /// Country of domicile.
    pub country: Option<String>,
}

impl EntityProfile {
    /// Creates a profile with only the key set.
    #[must_use]
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            ..Default::default()
        }
    }

    /// Sets the company name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the ISIN.
    #[must_use]
    pub fn with_isin(mut self, isin: impl Into<String>) -> Self {
        self.isin = Some(isin.into());
        self
    }

    /// Sets the supervisor company id.
    #[must_use]
    pub fn with_company_id(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    /// Sets the industry.
    #[must_use]
    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Sets the country.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}
