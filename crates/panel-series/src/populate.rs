//! Population of sparse entity observations onto the monthly calendar.
//!
//! [`Populator`] turns one entity's dated observations into a dense
//! [`PopulatedSeries`]: duplicates within a month collapse to the last
//! observation, the result is aligned to the [`Calendar`] and missing months
//! are filled according to a [`FillPolicy`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use panel_core::{
    Calendar, CalendarPeriod, EntityId, EntityObservation, FillPolicy, PanelError, PanelRow,
    Record, Result,
};

/// A dense per-entity series aligned to the calendar.
///
/// Holds exactly one row per eligible period; periods outside the eligible
/// range are absent rather than null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulatedSeries {
    entity: EntityId,
    rows: BTreeMap<CalendarPeriod, Record>,
}

impl PopulatedSeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new(entity: EntityId) -> Self {
        Self {
            entity,
            rows: BTreeMap::new(),
        }
    }

    /// The entity this series belongs to.
    #[must_use]
    pub const fn entity(&self) -> &EntityId {
        &self.entity
    }

    /// Number of populated periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no period survived population.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of a period.
    #[must_use]
    pub fn get(&self, period: &CalendarPeriod) -> Option<&Record> {
        self.rows.get(period)
    }

    /// First populated period.
    #[must_use]
    pub fn first_period(&self) -> Option<CalendarPeriod> {
        self.rows.keys().next().copied()
    }

    /// Last populated period.
    #[must_use]
    pub fn last_period(&self) -> Option<CalendarPeriod> {
        self.rows.keys().next_back().copied()
    }

    /// Iterates over (period, values) in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (&CalendarPeriod, &Record)> {
        self.rows.iter()
    }

    /// Converts into panel rows in calendar order.
    #[must_use]
    pub fn into_rows(self) -> Vec<PanelRow> {
        let entity = self.entity;
        self.rows
            .into_iter()
            .map(|(period, values)| PanelRow {
                entity: entity.clone(),
                period,
                values,
            })
            .collect()
    }
}

/// Aligns entity observations to a calendar.
#[derive(Clone, Copy, Debug)]
pub struct Populator<'a> {
    calendar: &'a Calendar,
    policy: FillPolicy,
}

impl<'a> Populator<'a> {
    /// Creates a populator for a calendar and fill policy.
    #[must_use]
    pub const fn new(calendar: &'a Calendar, policy: FillPolicy) -> Self {
        Self { calendar, policy }
    }

    /// The fill policy in use.
    #[must_use]
    pub const fn policy(&self) -> FillPolicy {
        self.policy
    }

    /// Populates one entity.
    ///
    /// Observations must belong to `entity` and be sorted by date. Zero
    /// observations yield an empty series.
    ///
    /// # Errors
    /// Returns [`PanelError::EntityMismatch`] or [`PanelError::NonChronological`]
    /// for malformed input.
    #[instrument(skip(self, observations), fields(entity = %entity, policy = ?self.policy, count = observations.len()))]
    pub fn populate(
        &self,
        entity: &EntityId,
        observations: &[EntityObservation],
    ) -> Result<PopulatedSeries> {
        let collapsed = collapse(entity, observations)?;
        let rows = match self.policy {
            FillPolicy::Forward => self.forward(&collapsed, merge_into),
            FillPolicy::Replace => {
                self.forward(&collapsed, |carry, values| carry.clone_from(values))
            }
            FillPolicy::Backward => self.backward(&collapsed),
            FillPolicy::AsObserved => collapsed
                .into_iter()
                .filter(|(period, values)| self.calendar.contains(period) && !values.is_empty())
                .collect(),
        };
        debug!(rows = rows.len(), "Populated series");
        Ok(PopulatedSeries {
            entity: entity.clone(),
            rows,
        })
    }

    /// Carries values forward, seeded by the latest observation before the calendar.
    ///
    /// `apply` folds each observed record into the carry.
    fn forward(
        &self,
        collapsed: &BTreeMap<CalendarPeriod, Record>,
        apply: fn(&mut Record, &Record),
    ) -> BTreeMap<CalendarPeriod, Record> {
        let start = self.calendar.start();
        let mut carry = Record::new();
        for values in collapsed.range(..start).map(|(_, v)| v) {
            apply(&mut carry, values);
        }

        let mut rows = BTreeMap::new();
        for period in self.calendar {
            if let Some(values) = collapsed.get(period) {
                apply(&mut carry, values);
            }
            if !carry.is_empty() {
                rows.insert(*period, carry.clone());
            }
        }
        rows
    }

    /// Takes each field from the next observation, restricted to the observed years.
    fn backward(&self, collapsed: &BTreeMap<CalendarPeriod, Record>) -> BTreeMap<CalendarPeriod, Record> {
        let observed: BTreeMap<&CalendarPeriod, &Record> = collapsed
            .iter()
            .filter(|(period, _)| self.calendar.contains(period))
            .collect();
        let (Some(first), Some(last)) = (observed.keys().next(), observed.keys().next_back()) else {
            return BTreeMap::new();
        };
        let (first_year, last_year) = (first.year(), last.year());
        let eligible: Vec<CalendarPeriod> = self
            .calendar
            .iter()
            .filter(|p| (first_year..=last_year).contains(&p.year()))
            .copied()
            .collect();

        let mut filled = vec![Record::new(); eligible.len()];
        let mut carry = Record::new();
        for (i, period) in eligible.iter().enumerate().rev() {
            if let Some(values) = observed.get(period) {
                merge_into(&mut carry, values);
            }
            filled[i].clone_from(&carry);
        }

        // months after the final observation keep its values
        let mut carry = Record::new();
        for values in &mut filled {
            for (name, value) in &carry {
                values.entry(name.clone()).or_insert_with(|| value.clone());
            }
            carry.clone_from(values);
        }

        eligible
            .into_iter()
            .zip(filled)
            .filter(|(_, values)| !values.is_empty())
            .collect()
    }
}

/// Validates input order and keeps the last observation of each month.
fn collapse(
    entity: &EntityId,
    observations: &[EntityObservation],
) -> Result<BTreeMap<CalendarPeriod, Record>> {
    let mut collapsed = BTreeMap::new();
    let mut previous = None;
    for observation in observations {
        if &observation.entity != entity {
            return Err(PanelError::EntityMismatch {
                expected: entity.to_string(),
                found: observation.entity.to_string(),
            });
        }
        if previous.is_some_and(|date| observation.date < date) {
            return Err(PanelError::NonChronological {
                entity: entity.to_string(),
                date: observation.date.to_string(),
            });
        }
        previous = Some(observation.date);
        collapsed.insert(observation.period(), observation.fields.clone());
    }
    Ok(collapsed)
}

fn merge_into(carry: &mut Record, values: &Record) {
    for (name, value) in values {
        carry.insert(name.clone(), value.clone());
    }
}
