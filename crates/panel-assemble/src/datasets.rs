//! Regression datasets for both hypotheses.
//!
//! - H1: credit rating level against one provider's ESG scores, monthly.
//! - H2 monthly / yearly: forward rating change against ESG availability.
//! - H2 summary: one row per company over the thesis horizon.

use std::collections::BTreeMap;
use tracing::{info, instrument};

use panel_core::{
    BatchReport, EntityProfile, EsgProvider, FieldValue, FilterReport, PanelRow, Result, fields,
};
use panel_series::{annotate_changes, year_end};

use crate::assembler::PanelAssembler;
use crate::dummies::DummyKind;
use crate::panel::Panel;
use crate::summary::{SummaryConfig, summarize, to_panel};

/// Sheet names of the stored datasets.
pub mod sheets {
    use panel_core::EsgProvider;

    /// Monthly H2 panel.
    pub const H2_MONTHLY: &str = "h2_monthly";
    /// Yearly H2 panel.
    pub const H2_YEARLY: &str = "h2_yearly";
    /// Per-company H2 summary.
    pub const H2_SUMMARY: &str = "h2_summary";

    /// H1 panel of a provider, e.g. `h1_refinitiv`.
    #[must_use]
    pub fn h1(provider: EsgProvider) -> String {
        format!("h1_{}", provider.name())
    }
}

/// Cleaned and populated tables the datasets are built from.
#[derive(Clone, Debug, Default)]
pub struct DatasetInputs {
    /// Monthly populated credit ratings.
    pub ratings: Panel,
    /// Monthly populated accounting controls.
    pub controls: Panel,
    /// ESG scores per provider, as observed.
    pub esg: BTreeMap<EsgProvider, Panel>,
    /// Company reference data.
    pub profiles: Vec<EntityProfile>,
}

impl DatasetInputs {
    fn esg(&self, provider: EsgProvider) -> Panel {
        self.esg.get(&provider).cloned().unwrap_or_default()
    }

    /// Ordinal ratings without `NR` periods.
    fn rated(&self) -> Result<Panel> {
        let rated = self.ratings.select(&[fields::ORDINAL_RATING])?;
        Ok(rated.filter(|r| r.number(fields::ORDINAL_RATING) != Some(0.0)))
    }

    /// The total score of every provider, each as its own panel.
    fn esg_totals(&self) -> Result<Vec<Panel>> {
        EsgProvider::ALL
            .iter()
            .map(|p| {
                let panel = self.esg(*p);
                if panel.has_column(p.total()) {
                    panel.select(&[p.total()])
                } else {
                    Ok(Panel::new(vec![p.total().to_string()]))
                }
            })
            .collect()
    }
}

/// Tunables of the dataset builders.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetOptions {
    /// Winsorization limits applied to the operating margin of H2 panels.
    pub winsorize: Option<(f64, f64)>,
    /// Summarizer settings for the H2 summary.
    pub summary: SummaryConfig,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            winsorize: Some((0.01, 0.01)),
            summary: SummaryConfig::default(),
        }
    }
}

fn h2_required() -> Vec<&'static str> {
    let mut required = vec![fields::CREDIT_RTG_CHANGE];
    required.extend(fields::control::ALL);
    required.extend([fields::INDUSTRY, fields::COUNTRY]);
    required
}

/// Adds the ESG availability indicator: 1 if any provider total is present.
///
/// # Errors
/// Returns [`panel_core::PanelError::ColumnConflict`] if the indicator already exists.
pub fn mark_esg_rated(mut panel: Panel) -> Result<Panel> {
    panel.add_column(fields::ESG_RATED)?;
    for row in panel.rows_mut() {
        let rated = EsgProvider::ALL.iter().any(|p| row.get(p.total()).is_some());
        row.set(
            fields::ESG_RATED,
            Some(FieldValue::Number(if rated { 1.0 } else { 0.0 })),
        );
    }
    Ok(panel)
}

fn winsorize_margin(panel: Panel, options: &DatasetOptions) -> Result<Panel> {
    match options.winsorize {
        Some((lower, upper)) => panel.winsorize(fields::control::OPER_MARGIN, lower, upper),
        None => Ok(panel),
    }
}

/// Builds the H1 panel of one provider.
///
/// ESG scores as observed, left-joined with the populated rating and
/// controls; rows missing any score, the rating, a control or the
/// classification are dropped, then `NR` rows. Year, industry and country
/// dummies are appended.
///
/// # Errors
/// Returns a column error if an input lacks an expected column.
#[instrument(skip(inputs))]
pub fn h1(inputs: &DatasetInputs, provider: EsgProvider) -> Result<(Panel, FilterReport)> {
    let esg = inputs.esg(provider).select(&provider.fields())?;
    let ratings = inputs.ratings.select(&[fields::ORDINAL_RATING])?;
    let controls = inputs.controls.select(&fields::control::ALL)?;

    let mut required = provider.fields().to_vec();
    required.push(fields::ORDINAL_RATING);
    required.extend(fields::control::ALL);
    required.extend([fields::INDUSTRY, fields::COUNTRY]);

    PanelAssembler::new(sheets::h1(provider), esg)
        .left_join(&ratings)?
        .left_join(&controls)?
        .with_profiles(&inputs.profiles)?
        .require(&required)
        .exclude_not_rated(fields::ORDINAL_RATING)
        .dummies(&[DummyKind::Year, DummyKind::Industry, DummyKind::Country])
        .assemble()
}

/// Builds the monthly H2 panel.
///
/// Rated months carry the forward change of the ordinal rating, the
/// controls, each provider's total score and [`fields::ESG_RATED`].
///
/// # Errors
/// Returns a column error if an input lacks an expected column.
#[instrument(skip(inputs, options))]
pub fn h2_monthly(inputs: &DatasetInputs, options: &DatasetOptions) -> Result<(Panel, FilterReport)> {
    let mut rows = inputs.rated()?.into_rows();
    annotate_changes(&mut rows, fields::ORDINAL_RATING, fields::CREDIT_RTG_CHANGE)?;
    let spine = change_spine(rows);
    let controls = inputs.controls.select(&fields::control::ALL)?;

    h2_assemble(sheets::H2_MONTHLY, spine, &controls, inputs.esg_totals()?, inputs, options)
}

/// Builds the yearly H2 panel.
///
/// Ratings, controls and scores are collapsed to the last month of each year
/// before the change is taken, so changes are year over year.
///
/// # Errors
/// Returns a column error if an input lacks an expected column.
#[instrument(skip(inputs, options))]
pub fn h2_yearly(inputs: &DatasetInputs, options: &DatasetOptions) -> Result<(Panel, FilterReport)> {
    let mut rows = year_end(inputs.rated()?.rows())?;
    annotate_changes(&mut rows, fields::ORDINAL_RATING, fields::CREDIT_RTG_CHANGE)?;
    let spine = change_spine(rows);

    let yearly = |panel: Panel| -> Result<Panel> {
        let columns = panel.columns().to_vec();
        Ok(Panel::with_columns(columns, year_end(panel.rows())?))
    };
    let controls = yearly(inputs.controls.select(&fields::control::ALL)?)?;
    let totals = inputs
        .esg_totals()?
        .into_iter()
        .map(yearly)
        .collect::<Result<Vec<_>>>()?;

    h2_assemble(sheets::H2_YEARLY, spine, &controls, totals, inputs, options)
}

fn change_spine(rows: Vec<PanelRow>) -> Panel {
    let columns = [fields::ORDINAL_RATING, fields::CREDIT_RTG_CHANGE]
        .iter()
        .map(|c| (*c).to_string())
        .collect();
    Panel::with_columns(columns, rows)
}

fn h2_assemble(
    name: &str,
    spine: Panel,
    controls: &Panel,
    totals: Vec<Panel>,
    inputs: &DatasetInputs,
    options: &DatasetOptions,
) -> Result<(Panel, FilterReport)> {
    let mut assembler = PanelAssembler::new(name, spine).left_join(controls)?;
    for total in &totals {
        assembler = assembler.left_join(total)?;
    }
    let (panel, report) = assembler
        .with_profiles(&inputs.profiles)?
        .map(mark_esg_rated)?
        .require(&h2_required())
        .dummies(&[DummyKind::Year, DummyKind::Industry, DummyKind::Country])
        .assemble()?;
    Ok((winsorize_margin(panel, options)?, report))
}

/// Builds the per-company H2 summary from the monthly H2 panel.
///
/// Industry and country dummies are appended; the summary has no year dimension.
///
/// # Errors
/// Returns a column error if the monthly panel lacks the change or indicator.
#[instrument(skip(monthly, config), fields(rows = monthly.len()))]
pub fn h2_summary(monthly: &Panel, config: &SummaryConfig) -> Result<(Panel, BatchReport)> {
    let (summaries, report) = summarize(monthly, config)?;
    let (panel, _) = PanelAssembler::new(sheets::H2_SUMMARY, to_panel(&summaries, config))
        .dummies(&[DummyKind::Industry, DummyKind::Country])
        .assemble()?;
    report.log(sheets::H2_SUMMARY);
    info!(entities = panel.len(), "Built H2 summary");
    Ok((panel, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::{CalendarPeriod, EntityId};

    fn row(entity: &str, year: i32, month: u32) -> PanelRow {
        PanelRow::new(EntityId::new(entity), CalendarPeriod::new(year, month).unwrap())
    }

    fn controls(entity: &str, year: i32, month: u32) -> PanelRow {
        row(entity, year, month)
            .with_value(fields::control::SIZE, 10.0)
            .with_value(fields::control::LEVERAGE, 0.4)
            .with_value(fields::control::INTEREST_COVERAGE, 3.0)
            .with_value(fields::control::OPER_MARGIN, 0.1)
    }

    fn inputs() -> DatasetInputs {
        let ratings = Panel::from_rows(vec![
            row("A", 2010, 11).with_value(fields::ORDINAL_RATING, 14.0),
            row("A", 2010, 12).with_value(fields::ORDINAL_RATING, 15.0),
            row("A", 2011, 1).with_value(fields::ORDINAL_RATING, 15.0),
            row("B", 2010, 12).with_value(fields::ORDINAL_RATING, 0.0),
            row("B", 2011, 1).with_value(fields::ORDINAL_RATING, 9.0),
        ]);
        let controls = Panel::from_rows(vec![
            controls("A", 2010, 11),
            controls("A", 2010, 12),
            controls("A", 2011, 1),
            controls("B", 2010, 12),
            controls("B", 2011, 1),
        ]);
        let refinitiv = Panel::from_rows(vec![
            row("A", 2010, 12)
                .with_value(fields::refinitiv::TOTAL, 60.0)
                .with_value(fields::refinitiv::ENV, 50.0)
                .with_value(fields::refinitiv::SOCIAL, 55.0)
                .with_value(fields::refinitiv::GOV, 70.0),
            row("B", 2010, 12)
                .with_value(fields::refinitiv::TOTAL, 40.0)
                .with_value(fields::refinitiv::ENV, 30.0)
                .with_value(fields::refinitiv::SOCIAL, 45.0)
                .with_value(fields::refinitiv::GOV, 50.0),
        ]);
        let profiles = vec![
            EntityProfile::new(EntityId::new("A"))
                .with_industry("Utility")
                .with_country("FRANCE"),
            EntityProfile::new(EntityId::new("B"))
                .with_industry("Energy")
                .with_country("SPAIN"),
        ];
        DatasetInputs {
            ratings,
            controls,
            esg: BTreeMap::from([(EsgProvider::Refinitiv, refinitiv)]),
            profiles,
        }
    }

    #[test]
    fn test_h1_excludes_not_rated() {
        let (panel, report) = h1(&inputs(), EsgProvider::Refinitiv).unwrap();
        assert_eq!(report.rows_in, 2);
        assert_eq!(report.not_rated, 1);
        assert_eq!(panel.len(), 1);
        assert_eq!(panel.rows()[0].number(fields::ORDINAL_RATING), Some(15.0));
    }

    #[test]
    fn test_h1_missing_provider_columns() {
        assert!(h1(&inputs(), EsgProvider::SpGlobal).is_err());
    }

    #[test]
    fn test_h2_monthly_changes_and_indicator() {
        let options = DatasetOptions {
            winsorize: None,
            ..Default::default()
        };
        let (panel, report) = h2_monthly(&inputs(), &options).unwrap();
        // the last month of every entity has no forward change
        assert_eq!(report.incomplete, 2);
        assert_eq!(panel.len(), 2);
        let a: Vec<_> = panel
            .rows()
            .iter()
            .map(|r| (r.number(fields::CREDIT_RTG_CHANGE), r.number(fields::ESG_RATED)))
            .collect();
        assert_eq!(a, vec![(Some(1.0), Some(0.0)), (Some(0.0), Some(1.0))]);
    }

    #[test]
    fn test_h2_yearly_changes_year_over_year() {
        let (panel, _) = h2_yearly(&inputs(), &DatasetOptions::default()).unwrap();
        assert_eq!(panel.len(), 1);
        let row = &panel.rows()[0];
        assert_eq!(row.entity.as_str(), "A");
        assert_eq!(row.period, CalendarPeriod::new(2010, 12).unwrap());
        assert_eq!(row.number(fields::CREDIT_RTG_CHANGE), Some(0.0));
        assert_eq!(row.number(fields::ESG_RATED), Some(1.0));
    }

    #[test]
    fn test_h2_summary_from_monthly() {
        let options = DatasetOptions {
            winsorize: None,
            ..Default::default()
        };
        let (monthly, _) = h2_monthly(&inputs(), &options).unwrap();
        let (summary, report) = h2_summary(&monthly, &options.summary).unwrap();
        assert!(report.is_clean());
        assert_eq!(summary.len(), 1);
        // the window is restricted to the month with an ESG score
        assert_eq!(summary.rows()[0].number(fields::summary::CHANGES), Some(0.0));
        assert_eq!(summary.rows()[0].number(fields::ESG_RATED), Some(1.0));
    }
}
