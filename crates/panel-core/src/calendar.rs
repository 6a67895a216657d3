//! The canonical monthly calendar.
//!
//! [`Calendar`] is the single source of truth for reporting periods. Every
//! populated series and every panel is aligned to it positionally.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};
use crate::types::CalendarPeriod;

/// First month of the thesis study window.
pub const STUDY_START: (i32, u32) = (2006, 1);
/// Last month of the thesis study window.
pub const STUDY_END: (i32, u32) = (2020, 12);

/// A gapless, strictly increasing sequence of monthly periods.
///
/// Serialized as its `start` and `end` (year, month) bounds; deserializing
/// regenerates the periods and rejects invalid bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CalendarBounds", into = "CalendarBounds")]
pub struct Calendar {
    periods: Vec<CalendarPeriod>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct CalendarBounds {
    start: (i32, u32),
    end: (i32, u32),
}

impl TryFrom<CalendarBounds> for Calendar {
    type Error = PanelError;

    fn try_from(bounds: CalendarBounds) -> Result<Self> {
        Self::from_bounds(bounds.start, bounds.end)
    }
}

impl From<Calendar> for CalendarBounds {
    fn from(calendar: Calendar) -> Self {
        let (start, end) = (calendar.start(), calendar.end());
        Self {
            start: (start.year(), start.month()),
            end: (end.year(), end.month()),
        }
    }
}

impl Calendar {
    /// Generates every month from `start` to `end`, both inclusive.
    ///
    /// # Errors
    /// Returns [`PanelError::InvalidRange`] when `start` lies after `end`.
    pub fn between(start: CalendarPeriod, end: CalendarPeriod) -> Result<Self> {
        if start > end {
            return Err(PanelError::InvalidRange(format!(
                "start {start} is after end {end}"
            )));
        }
        let len = (end.index() - start.index() + 1) as usize;
        let mut periods = Vec::with_capacity(len);
        let mut current = start;
        while current <= end {
            periods.push(current);
            current = current.next();
        }
        Ok(Self { periods })
    }

    /// Generates the calendar from raw (year, month) bounds.
    ///
    /// # Errors
    /// Returns [`PanelError::InvalidRange`] for an invalid month or reversed bounds.
    pub fn from_bounds(start: (i32, u32), end: (i32, u32)) -> Result<Self> {
        Self::between(
            CalendarPeriod::new(start.0, start.1)?,
            CalendarPeriod::new(end.0, end.1)?,
        )
    }

    /// Generates the calendar covering the months of two dates.
    ///
    /// # Errors
    /// Returns [`PanelError::InvalidRange`] when `start` lies after `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Self::between(
            CalendarPeriod::from_date(start),
            CalendarPeriod::from_date(end),
        )
    }

    /// The thesis study window, January 2006 to December 2020.
    ///
    /// # Errors
    /// Never fails for the built-in bounds; the signature mirrors [`Calendar::from_bounds`].
    pub fn study_window() -> Result<Self> {
        Self::from_bounds(STUDY_START, STUDY_END)
    }

    /// First period.
    #[must_use]
    pub fn start(&self) -> CalendarPeriod {
        self.periods[0]
    }

    /// Last period.
    #[must_use]
    pub fn end(&self) -> CalendarPeriod {
        self.periods[self.periods.len() - 1]
    }

    /// Number of periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Always false; a calendar holds at least one period.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Returns the periods as a slice.
    #[must_use]
    pub fn periods(&self) -> &[CalendarPeriod] {
        &self.periods
    }

    /// Returns an iterator over the periods.
    pub fn iter(&self) -> impl Iterator<Item = &CalendarPeriod> {
        self.periods.iter()
    }

    /// Position of `period` in the calendar, computed without searching.
    #[must_use]
    pub fn position(&self, period: &CalendarPeriod) -> Option<usize> {
        let offset = period.index() - self.start().index();
        if offset < 0 || offset >= self.periods.len() as i64 {
            return None;
        }
        Some(offset as usize)
    }

    /// Returns true if `period` lies inside the calendar.
    #[must_use]
    pub fn contains(&self, period: &CalendarPeriod) -> bool {
        self.position(period).is_some()
    }

    /// Distinct years covered, ascending.
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        (self.start().year()..=self.end().year()).collect()
    }
}

impl<'a> IntoIterator for &'a Calendar {
    type Item = &'a CalendarPeriod;
    type IntoIter = std::slice::Iter<'a, CalendarPeriod>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}
