//! Design matrices for the ordered-response models of both hypotheses.
//!
//! Every [`AnalysisMode`] slices the hypothesis datasets, drops columns made
//! constant by the slice and pairs the remaining panel with a [`ModelSpec`]
//! naming the dependent variable, its ordered categories and the regressors.
//! Estimation itself happens outside this crate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use panel_core::{EsgProvider, PanelError, Result, fields};

use crate::datasets::h2_summary;
use crate::dummies::{DummyKind, dummy_columns};
use crate::panel::Panel;
use crate::summary::SummaryConfig;
use crate::transform::QuantileTail;

/// Which family of models to prepare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Baseline and full models of both hypotheses.
    Main,
    /// Full models on sub-sample periods.
    SubPeriods,
    /// Full models per industry.
    IndustryBreakdown,
    /// H1 with lagged regressors.
    Endogeneity,
    /// H2 on monthly and yearly changes.
    AlternativeModel,
    /// H1 on the largest and smallest companies.
    SizeImpact,
}

impl AnalysisMode {
    /// Every mode.
    pub const ALL: [Self; 6] = [
        Self::Main,
        Self::SubPeriods,
        Self::IndustryBreakdown,
        Self::Endogeneity,
        Self::AlternativeModel,
        Self::SizeImpact,
    ];

    /// Kebab-case name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::SubPeriods => "sub-periods",
            Self::IndustryBreakdown => "industry-breakdown",
            Self::Endogeneity => "endogeneity",
            Self::AlternativeModel => "alternative-model",
            Self::SizeImpact => "size-impact",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisMode {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| PanelError::InvalidParameter(format!("unknown analysis mode {s:?}")))
    }
}

/// Sorted distinct values of an ordinal dependent variable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderedCategories(Vec<f64>);

impl OrderedCategories {
    /// Collects the distinct non-null values in ascending order.
    #[must_use]
    pub fn from_values(values: &[Option<f64>]) -> Self {
        let distinct: BTreeSet<u64> = values
            .iter()
            .flatten()
            .map(|v| ordered_bits(*v))
            .collect();
        Self(distinct.into_iter().map(from_ordered_bits).collect())
    }

    /// Category values in order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of a value among the categories.
    #[must_use]
    pub fn code(&self, value: f64) -> Option<usize> {
        self.0.iter().position(|c| *c == value)
    }
}

// Bit pattern whose unsigned order matches the float order.
fn ordered_bits(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits >> 63 == 1 { !bits } else { bits | (1 << 63) }
}

fn from_ordered_bits(bits: u64) -> f64 {
    if bits >> 63 == 1 {
        f64::from_bits(bits & !(1 << 63))
    } else {
        f64::from_bits(!bits)
    }
}

/// Description of one model handed to an estimation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name, also used as the exported sheet name.
    pub name: String,
    /// Dependent variable column.
    pub dependent: String,
    /// Ordered categories of the dependent variable.
    pub categories: OrderedCategories,
    /// Regressor columns in order.
    pub regressors: Vec<String>,
    /// Number of rows in the design matrix.
    pub observations: usize,
}

/// A model specification with its data.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignMatrix {
    /// What to estimate.
    pub spec: ModelSpec,
    /// Dependent variable and regressors.
    pub panel: Panel,
}

impl DesignMatrix {
    /// Builds a design matrix from a sliced panel.
    ///
    /// Constant columns other than the dependent variable are dropped first;
    /// regressors that did not survive are left out of the spec and dummy
    /// families listed in `dummies` are appended in column order.
    ///
    /// # Errors
    /// Returns [`PanelError::MissingColumn`] if the dependent variable is absent
    /// and [`PanelError::InvalidParameter`] if the slice is empty.
    pub fn build(
        name: impl Into<String>,
        panel: Panel,
        dependent: &str,
        regressors: &[&str],
        dummies: &[DummyKind],
    ) -> Result<Self> {
        let name = name.into();
        panel.require_columns(&[dependent])?;
        if panel.is_empty() {
            return Err(PanelError::InvalidParameter(format!("{name} has no rows")));
        }
        let (panel, dropped) = panel.drop_constant_columns(&[dependent]);

        let mut columns: Vec<String> = regressors
            .iter()
            .filter(|r| panel.has_column(r))
            .map(|r| (*r).to_string())
            .collect();
        for kind in dummies {
            columns.extend(dummy_columns(&panel, *kind));
        }

        let mut selected: Vec<&str> = vec![dependent];
        selected.extend(columns.iter().map(String::as_str));
        let panel = panel.select(&selected)?;
        let categories = OrderedCategories::from_values(&panel.numeric(dependent));
        debug!(model = %name, dropped = dropped.len(), regressors = columns.len(), "Built design matrix");

        Ok(Self {
            spec: ModelSpec {
                name,
                dependent: dependent.to_string(),
                categories,
                regressors: columns,
                observations: panel.len(),
            },
            panel,
        })
    }
}

/// The datasets every analysis draws from.
#[derive(Clone, Debug, Default)]
pub struct AnalysisInputs {
    /// H1 panels per provider.
    pub h1: BTreeMap<EsgProvider, Panel>,
    /// Monthly H2 panel.
    pub h2_monthly: Panel,
    /// Yearly H2 panel.
    pub h2_yearly: Panel,
    /// Per-company H2 summary.
    pub h2_summary: Panel,
    /// Summarizer settings used to rebuild the summary for sub-periods.
    pub summary: SummaryConfig,
}

const H1_DUMMIES: [DummyKind; 3] = [DummyKind::Year, DummyKind::Industry, DummyKind::Country];
const H2_DUMMIES: [DummyKind; 2] = [DummyKind::Industry, DummyKind::Country];

const H1_SUB_PERIODS: [(i32, i32); 5] = [(2006, 2012), (2013, 2019), (2006, 2010), (2011, 2015), (2016, 2019)];
const H2_SUB_PERIODS: [(i32, i32); 2] = [(2006, 2016), (2010, 2019)];

fn h1_regressors(provider: EsgProvider, controls: bool) -> Vec<&'static str> {
    let mut regressors = vec![provider.total()];
    if controls {
        regressors.extend(fields::control::ALL);
    }
    regressors
}

fn h2_regressors(averages: bool, long_term: bool) -> Vec<&'static str> {
    use fields::summary;
    let mut regressors = vec![fields::ESG_RATED];
    if averages {
        regressors.extend([summary::AVG_SIZE, summary::AVG_LEV, summary::AVG_ICOV, summary::AVG_OMAR]);
    }
    if long_term {
        regressors.push(summary::LONG_TERM);
    }
    regressors
}

fn h1_full(name: String, panel: Panel, provider: EsgProvider) -> Result<DesignMatrix> {
    DesignMatrix::build(
        name,
        panel,
        fields::ORDINAL_RATING,
        &h1_regressors(provider, true),
        &H1_DUMMIES,
    )
}

fn h2_full(name: String, panel: Panel) -> Result<DesignMatrix> {
    DesignMatrix::build(
        name,
        panel,
        fields::summary::CHANGES,
        &h2_regressors(true, true),
        &H2_DUMMIES,
    )
}

impl AnalysisInputs {
    fn h1_panel(&self, provider: EsgProvider) -> Result<&Panel> {
        self.h1
            .get(&provider)
            .ok_or_else(|| PanelError::SourceNotConfigured(format!("h1 dataset for {provider}")))
    }

    fn main(&self) -> Result<Vec<DesignMatrix>> {
        let mut models = Vec::new();
        for (provider, panel) in &self.h1 {
            for (label, controls) in [("base", false), ("full", true)] {
                models.push(DesignMatrix::build(
                    format!("h1_{provider}_{label}"),
                    panel.clone(),
                    fields::ORDINAL_RATING,
                    &h1_regressors(*provider, controls),
                    &H1_DUMMIES,
                )?);
            }
        }
        for (label, averages, long_term) in [
            ("base", false, false),
            ("extended", true, false),
            ("full", true, true),
        ] {
            models.push(DesignMatrix::build(
                format!("h2_{label}"),
                self.h2_summary.clone(),
                fields::summary::CHANGES,
                &h2_regressors(averages, long_term),
                &H2_DUMMIES,
            )?);
        }
        Ok(models)
    }

    fn sub_periods(&self) -> Result<Vec<DesignMatrix>> {
        let provider = EsgProvider::Refinitiv;
        let h1 = self.h1_panel(provider)?;
        let mut models = Vec::new();
        for (from, to) in H1_SUB_PERIODS {
            models.push(h1_full(
                format!("h1_{provider}_{from}_{to}"),
                h1.slice_years(from, to),
                provider,
            )?);
        }
        for (from, to) in H2_SUB_PERIODS {
            let config = self.summary.clone().with_years(Some(from), Some(to));
            let (summary, _) = h2_summary(&self.h2_monthly, &config)?;
            models.push(h2_full(format!("h2_{from}_{to}"), summary)?);
        }
        Ok(models)
    }

    fn industry_breakdown(&self) -> Result<Vec<DesignMatrix>> {
        let provider = EsgProvider::Refinitiv;
        let h1 = self.h1_panel(provider)?;
        let industries = |panel: &Panel| -> BTreeSet<String> {
            panel
                .rows()
                .iter()
                .filter_map(|r| r.text(fields::INDUSTRY).map(str::to_string))
                .collect()
        };
        let mut models = Vec::new();
        for industry in industries(h1) {
            models.push(h1_full(
                format!("h1_{provider}_{}", slug(&industry)),
                h1.slice_text(fields::INDUSTRY, &industry),
                provider,
            )?);
        }
        for industry in industries(&self.h2_summary) {
            models.push(h2_full(
                format!("h2_{}", slug(&industry)),
                self.h2_summary.slice_text(fields::INDUSTRY, &industry),
            )?);
        }
        Ok(models)
    }

    fn endogeneity(&self) -> Result<Vec<DesignMatrix>> {
        let provider = EsgProvider::Refinitiv;
        let h1 = self.h1_panel(provider)?;
        let regressors = h1_regressors(provider, true);
        let mut models = Vec::new();
        for esg_lag in [12, 24] {
            let mut lags = vec![(provider.total(), esg_lag)];
            lags.extend(fields::control::ALL.iter().map(|c| (*c, 12)));
            let lagged = h1.lag(&lags)?;
            let mut required = regressors.clone();
            required.push(fields::ORDINAL_RATING);
            let (complete, dropped) = lagged.drop_incomplete(&required);
            debug!(esg_lag, dropped, "Dropped rows without lagged values");
            models.push(h1_full(
                format!("h1_{provider}_lag{esg_lag}"),
                complete,
                provider,
            )?);
        }
        Ok(models)
    }

    fn alternative_model(&self) -> Result<Vec<DesignMatrix>> {
        let mut regressors = vec![fields::ESG_RATED];
        regressors.extend(fields::control::ALL);
        [("h2_monthly_change", &self.h2_monthly), ("h2_yearly_change", &self.h2_yearly)]
            .into_iter()
            .map(|(name, panel)| {
                DesignMatrix::build(
                    name,
                    panel.clone(),
                    fields::CREDIT_RTG_CHANGE,
                    &regressors,
                    &H1_DUMMIES,
                )
            })
            .collect()
    }

    fn size_impact(&self) -> Result<Vec<DesignMatrix>> {
        let provider = EsgProvider::Refinitiv;
        let h1 = self.h1_panel(provider)?;
        [("top25", QuantileTail::Top), ("bottom25", QuantileTail::Bottom)]
            .into_iter()
            .map(|(label, tail)| {
                let slice = h1.slice_quantile(fields::control::SIZE, tail, 0.25)?;
                h1_full(format!("h1_{provider}_{label}"), slice, provider)
            })
            .collect()
    }

    /// Prepares every model of a mode.
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] if a needed H1 dataset is
    /// missing, or a column error from slicing.
    pub fn design_matrices(&self, mode: AnalysisMode) -> Result<Vec<DesignMatrix>> {
        let models = match mode {
            AnalysisMode::Main => self.main()?,
            AnalysisMode::SubPeriods => self.sub_periods()?,
            AnalysisMode::IndustryBreakdown => self.industry_breakdown()?,
            AnalysisMode::Endogeneity => self.endogeneity()?,
            AnalysisMode::AlternativeModel => self.alternative_model()?,
            AnalysisMode::SizeImpact => self.size_impact()?,
        };
        info!(mode = %mode, models = models.len(), "Prepared design matrices");
        Ok(models)
    }
}

fn slug(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::{CalendarPeriod, EntityId, PanelRow};

    #[test]
    fn test_ordered_categories() {
        let categories =
            OrderedCategories::from_values(&[Some(1.0), Some(-2.0), None, Some(0.0), Some(1.0)]);
        assert_eq!(categories.values(), [-2.0, 0.0, 1.0]);
        assert_eq!(categories.code(0.0), Some(1));
        assert_eq!(categories.code(5.0), None);
    }

    #[test]
    fn test_mode_names_round_trip() {
        for mode in AnalysisMode::ALL {
            assert_eq!(mode.name().parse::<AnalysisMode>().unwrap(), mode);
        }
        assert!("robust".parse::<AnalysisMode>().is_err());
    }

    fn h1_panel() -> Panel {
        let rows = (0..6)
            .map(|i| {
                let entity = if i < 3 { "A" } else { "B" };
                PanelRow::new(EntityId::new(entity), CalendarPeriod::new(2010 + i, 1).unwrap())
                    .with_value(fields::ORDINAL_RATING, f64::from(12 + i % 3))
                    .with_value(fields::refinitiv::TOTAL, f64::from(50 + i))
                    .with_value(fields::control::SIZE, f64::from(i))
                    .with_value(fields::control::LEVERAGE, 0.5)
                    .with_value(fields::INDUSTRY, if i < 3 { "Utility" } else { "Energy" })
                    .with_value("industry_Utility", if i < 3 { 1.0 } else { 0.0 })
            })
            .collect();
        let mut panel = Panel::from_rows(rows);
        panel.sort();
        panel
    }

    #[test]
    fn test_design_matrix_drops_constant_regressors() {
        let model = DesignMatrix::build(
            "h1_test",
            h1_panel(),
            fields::ORDINAL_RATING,
            &h1_regressors(EsgProvider::Refinitiv, true),
            &[DummyKind::Industry],
        )
        .unwrap();
        assert_eq!(
            model.spec.regressors,
            vec![
                fields::refinitiv::TOTAL.to_string(),
                fields::control::SIZE.to_string(),
                "industry_Utility".to_string()
            ]
        );
        assert_eq!(model.spec.categories.values(), [12.0, 13.0, 14.0]);
        assert_eq!(model.spec.observations, 6);
        assert_eq!(model.panel.columns()[0], fields::ORDINAL_RATING);
    }

    #[test]
    fn test_industry_slice_drops_its_dummy() {
        let inputs = AnalysisInputs {
            h1: BTreeMap::from([(EsgProvider::Refinitiv, h1_panel())]),
            ..Default::default()
        };
        let models = inputs.industry_breakdown().unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].spec.name, "h1_refinitiv_energy");
        assert!(!models[0].spec.regressors.contains(&"industry_Utility".to_string()));
    }

    #[test]
    fn test_missing_inputs_fail() {
        let inputs = AnalysisInputs {
            h1: BTreeMap::from([(EsgProvider::Refinitiv, h1_panel())]),
            ..Default::default()
        };
        assert!(inputs.design_matrices(AnalysisMode::Endogeneity).is_err());
        let missing = AnalysisInputs::default();
        assert!(matches!(
            missing.design_matrices(AnalysisMode::SizeImpact),
            Err(PanelError::SourceNotConfigured(_))
        ));
    }
}
