//! Per-entity summaries of a monthly panel.
//!
//! Each entity collapses to one row: counts of rating changes, the number of
//! distinct years observed, averages of the controls and its classification.
//! A second pass over all summaries sets the long-window flag.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

use panel_core::{BatchReport, EntityId, FieldValue, PanelError, PanelRow, Result, fields};

use crate::panel::Panel;

/// Columns read by the summarizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Forward rating change column.
    pub change_field: String,
    /// Availability indicator restricting the window when it varies.
    pub indicator_field: String,
    /// Pairs of (control column, average column name).
    pub controls: Vec<(String, String)>,
    /// First calendar year included in the window.
    pub first_year: Option<i32>,
    /// Last calendar year included in the window.
    pub last_year: Option<i32>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        use fields::{control, summary};
        Self {
            change_field: fields::CREDIT_RTG_CHANGE.to_string(),
            indicator_field: fields::ESG_RATED.to_string(),
            controls: [
                (control::SIZE, summary::AVG_SIZE),
                (control::LEVERAGE, summary::AVG_LEV),
                (control::INTEREST_COVERAGE, summary::AVG_ICOV),
                (control::OPER_MARGIN, summary::AVG_OMAR),
            ]
            .iter()
            .map(|(c, a)| ((*c).to_string(), (*a).to_string()))
            .collect(),
            first_year: None,
            last_year: Some(2016),
        }
    }
}

impl SummaryConfig {
    /// Bounds the window to `first..=last` years; `None` leaves a side open.
    #[must_use]
    pub fn with_years(mut self, first: Option<i32>, last: Option<i32>) -> Self {
        self.first_year = first;
        self.last_year = last;
        self
    }
}

/// One entity collapsed over its window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Company key.
    pub entity: EntityId,
    /// Last period of the window.
    pub last_period: panel_core::CalendarPeriod,
    /// Non-zero rating changes.
    pub changes: usize,
    /// Positive rating changes.
    pub upgrades: usize,
    /// Negative rating changes.
    pub downgrades: usize,
    /// Distinct calendar years in the window.
    pub years: usize,
    /// Indicator value over the window.
    pub indicator: Option<f64>,
    /// Control averages, keyed by average column name.
    pub averages: BTreeMap<String, Option<f64>>,
    /// Industry classification.
    pub industry: Option<String>,
    /// Country of domicile.
    pub country: Option<String>,
    /// Whether the window is longer than the sample mean.
    pub long_term: bool,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn unique_text(entity: &EntityId, rows: &[&PanelRow], field: &str) -> Result<Option<String>> {
    let distinct: BTreeSet<Option<&str>> = rows.iter().map(|r| r.text(field)).collect();
    if distinct.len() > 1 {
        return Err(PanelError::NonUniqueClassification {
            entity: entity.to_string(),
            field: field.to_string(),
            count: distinct.len(),
        });
    }
    Ok(distinct.into_iter().next().flatten().map(str::to_string))
}

fn summarize_entity(
    entity: &EntityId,
    rows: &[&PanelRow],
    config: &SummaryConfig,
) -> Result<Option<EntitySummary>> {
    let mut window: Vec<&PanelRow> = rows
        .iter()
        .copied()
        .filter(|r| {
            let year = r.period.year();
            config.first_year.is_none_or(|y| year >= y) && config.last_year.is_none_or(|y| year <= y)
        })
        .collect();
    if window.is_empty() {
        return Ok(None);
    }

    let indicators: BTreeSet<Option<u64>> = window
        .iter()
        .map(|r| r.number(&config.indicator_field).map(f64::to_bits))
        .collect();
    if indicators.len() > 1 {
        window.retain(|r| r.number(&config.indicator_field) == Some(1.0));
        debug!(entity = %entity, rows = window.len(), "Restricted window to indicator periods");
        if window.is_empty() {
            return Ok(None);
        }
    }

    let changes: Vec<f64> = window
        .iter()
        .filter_map(|r| r.number(&config.change_field))
        .collect();
    let years: BTreeSet<i32> = window.iter().map(|r| r.period.year()).collect();
    let averages = config
        .controls
        .iter()
        .map(|(control, average)| {
            (
                average.clone(),
                mean(window.iter().filter_map(|r| r.number(control))),
            )
        })
        .collect();

    Ok(Some(EntitySummary {
        entity: entity.clone(),
        last_period: window.iter().map(|r| r.period).max().unwrap_or(rows[0].period),
        changes: changes.iter().filter(|c| **c != 0.0).count(),
        upgrades: changes.iter().filter(|c| **c > 0.0).count(),
        downgrades: changes.iter().filter(|c| **c < 0.0).count(),
        years: years.len(),
        indicator: window[0].number(&config.indicator_field),
        averages,
        industry: unique_text(entity, &window, fields::INDUSTRY)?,
        country: unique_text(entity, &window, fields::COUNTRY)?,
        long_term: false,
    }))
}

/// Summarizes every entity of a panel.
///
/// Entities are processed in key order, so the result does not depend on
/// the row order of the input. An entity with conflicting classifications is
/// recorded as failed in the [`BatchReport`]; one with no rows inside the
/// window is a data gap. The long-window flag compares each entity's year
/// count with the mean over the successful summaries.
///
/// # Errors
/// Returns [`PanelError::MissingColumn`] if the change or indicator column is absent.
#[instrument(skip(panel, config), fields(rows = panel.len()))]
pub fn summarize(panel: &Panel, config: &SummaryConfig) -> Result<(Vec<EntitySummary>, BatchReport)> {
    panel.require_columns(&[
        config.change_field.as_str(),
        config.indicator_field.as_str(),
    ])?;

    let mut groups: BTreeMap<&EntityId, Vec<&PanelRow>> = BTreeMap::new();
    for row in panel.rows() {
        groups.entry(&row.entity).or_default().push(row);
    }

    let mut report = BatchReport::new();
    let mut summaries = Vec::with_capacity(groups.len());
    for (entity, mut rows) in groups {
        rows.sort_by_key(|r| r.period);
        match summarize_entity(entity, &rows, config) {
            Ok(Some(summary)) => {
                report.record_processed(entity.clone());
                summaries.push(summary);
            }
            Ok(None) => report.record_gap(entity.clone()),
            Err(e) => report.record_failure(entity.clone(), e),
        }
    }

    if let Some(mean_years) = mean(summaries.iter().map(|s| s.years as f64)) {
        for summary in &mut summaries {
            summary.long_term = summary.years as f64 > mean_years;
        }
        info!(entities = summaries.len(), mean_years, "Summarized entities");
    }
    Ok((summaries, report))
}

/// Converts summaries into a panel keyed by each entity's last window period.
#[must_use]
pub fn to_panel(summaries: &[EntitySummary], config: &SummaryConfig) -> Panel {
    let mut columns: Vec<String> = [
        fields::summary::CHANGES,
        fields::summary::UPGRADE,
        fields::summary::DOWNGRADE,
        fields::summary::NO_YEARS,
        config.indicator_field.as_str(),
    ]
    .iter()
    .map(|c| (*c).to_string())
    .collect();
    columns.extend(config.controls.iter().map(|(_, average)| average.clone()));
    columns.extend(
        [fields::INDUSTRY, fields::COUNTRY, fields::summary::LONG_TERM]
            .iter()
            .map(|c| (*c).to_string()),
    );

    let rows = summaries
        .iter()
        .map(|s| {
            let mut row = PanelRow::new(s.entity.clone(), s.last_period)
                .with_value(fields::summary::CHANGES, s.changes as f64)
                .with_value(fields::summary::UPGRADE, s.upgrades as f64)
                .with_value(fields::summary::DOWNGRADE, s.downgrades as f64)
                .with_value(fields::summary::NO_YEARS, s.years as f64)
                .with_value(fields::summary::LONG_TERM, if s.long_term { 1.0 } else { 0.0 });
            row.set(config.indicator_field.as_str(), s.indicator.map(FieldValue::Number));
            for (name, value) in &s.averages {
                row.set(name.as_str(), value.map(FieldValue::Number));
            }
            row.set(fields::INDUSTRY, s.industry.clone().map(FieldValue::Text));
            row.set(fields::COUNTRY, s.country.clone().map(FieldValue::Text));
            row
        })
        .collect();
    Panel::with_columns(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use panel_core::CalendarPeriod;

    fn row(entity: &str, year: i32, month: u32, rated: f64, change: f64) -> PanelRow {
        PanelRow::new(EntityId::new(entity), CalendarPeriod::new(year, month).unwrap())
            .with_value(fields::ESG_RATED, rated)
            .with_value(fields::CREDIT_RTG_CHANGE, change)
            .with_value(fields::control::SIZE, 10.0)
            .with_value(fields::INDUSTRY, "Utility")
            .with_value(fields::COUNTRY, "FRANCE")
    }

    #[test]
    fn test_indicator_restricts_window() {
        let panel = Panel::from_rows(vec![
            row("A", 2010, 1, 0.0, 0.0),
            row("A", 2010, 2, 0.0, -1.0),
            row("A", 2010, 3, 1.0, 0.0),
            row("A", 2010, 4, 1.0, 0.0),
            row("A", 2010, 5, 1.0, 2.0),
        ]);
        let (summaries, report) = summarize(&panel, &SummaryConfig::default()).unwrap();
        assert!(report.is_clean());
        let a = &summaries[0];
        assert_eq!(a.changes, 1);
        assert_eq!(a.upgrades, 1);
        assert_eq!(a.downgrades, 0);
        assert_eq!(a.indicator, Some(1.0));
        assert_relative_eq!(a.averages[fields::summary::AVG_SIZE].unwrap(), 10.0);
        assert_eq!(a.industry.as_deref(), Some("Utility"));
    }

    #[test]
    fn test_long_term_independent_of_order() {
        let mut rows = vec![
            row("A", 2010, 1, 1.0, 0.0),
            row("A", 2011, 1, 1.0, 0.0),
            row("A", 2012, 1, 1.0, 0.0),
            row("B", 2010, 1, 0.0, 1.0),
            row("C", 2010, 1, 0.0, 1.0),
            row("C", 2011, 1, 0.0, 1.0),
        ];
        let forward = summarize(&Panel::from_rows(rows.clone()), &SummaryConfig::default())
            .unwrap()
            .0;
        rows.reverse();
        let backward = summarize(&Panel::from_rows(rows), &SummaryConfig::default())
            .unwrap()
            .0;
        assert_eq!(forward, backward);
        let flags: Vec<bool> = forward.iter().map(|s| s.long_term).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_horizon_and_classification_errors() {
        let panel = Panel::from_rows(vec![
            row("A", 2017, 1, 1.0, 0.0),
            row("B", 2010, 1, 1.0, 0.0),
            row("B", 2010, 2, 1.0, 0.0).with_value(fields::INDUSTRY, "Energy"),
        ]);
        let (summaries, report) = summarize(&panel, &SummaryConfig::default()).unwrap();
        assert!(summaries.is_empty());
        assert_eq!(report.data_gaps, vec![EntityId::new("A")]);
        assert!(matches!(
            report.failed[0].1,
            PanelError::NonUniqueClassification { .. }
        ));
    }

    #[test]
    fn test_to_panel_columns() {
        let panel = Panel::from_rows(vec![row("A", 2010, 1, 1.0, 1.0)]);
        let config = SummaryConfig::default();
        let (summaries, _) = summarize(&panel, &config).unwrap();
        let table = to_panel(&summaries, &config);
        assert_eq!(table.len(), 1);
        assert!(table.has_column(fields::summary::LONG_TERM));
        assert_eq!(table.rows()[0].number(fields::summary::CHANGES), Some(1.0));
        assert_eq!(table.rows()[0].text(fields::COUNTRY), Some("FRANCE"));
    }
}
