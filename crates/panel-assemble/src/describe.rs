//! Year-by-year descriptive statistics of a score.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use panel_core::{EntityId, EntityObservation};

use crate::transform::quantile;

/// Distribution of one score within one year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearStats {
    /// Calendar year.
    pub year: i32,
    /// Non-null observations.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation; `None` below two observations.
    pub std: Option<f64>,
    /// Smallest value.
    pub min: f64,
    /// 25th percentile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub q75: f64,
    /// Largest value.
    pub max: f64,
    /// Bias-corrected skewness; `None` below three observations.
    pub skewness: Option<f64>,
    /// Bias-corrected excess kurtosis; `None` below four observations.
    pub kurtosis: Option<f64>,
    /// Distinct companies with a value.
    pub companies: usize,
}

fn central_moments(values: &[f64], mean: f64) -> (f64, f64, f64) {
    values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d, m4 + d * d * d * d)
    })
}

/// Statistics of a sample; `None` when it is empty.
#[must_use]
pub fn stats(year: i32, values: &[f64], companies: usize) -> Option<YearStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let (s2, s3, s4) = central_moments(values, mean);
    let (m2, m3, m4) = (s2 / n, s3 / n, s4 / n);

    let std = (values.len() > 1).then(|| (s2 / (n - 1.0)).sqrt());
    let skewness = (values.len() > 2 && m2 > 0.0)
        .then(|| (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5));
    let kurtosis = (values.len() > 3 && m2 > 0.0).then(|| {
        let g2 = m4 / (m2 * m2) - 3.0;
        (n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0)
    });

    let sample: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    let q = |p: f64| quantile(&sample, p).unwrap_or(mean);
    Some(YearStats {
        year,
        count: values.len(),
        mean,
        std,
        min: q(0.0),
        q25: q(0.25),
        median: q(0.5),
        q75: q(0.75),
        max: q(1.0),
        skewness,
        kurtosis,
        companies,
    })
}

/// Statistics of `field` per calendar year of the observation dates, ascending.
#[must_use]
pub fn describe_by_year(observations: &[EntityObservation], field: &str) -> Vec<YearStats> {
    let mut by_year: BTreeMap<i32, (Vec<f64>, BTreeSet<&EntityId>)> = BTreeMap::new();
    for observation in observations {
        if let Some(value) = observation.get(field).and_then(|v| v.as_number()) {
            let (values, companies) = by_year.entry(observation.date.year()).or_default();
            values.push(value);
            companies.insert(&observation.entity);
        }
    }
    by_year
        .into_iter()
        .filter_map(|(year, (values, companies))| stats(year, &values, companies.len()))
        .collect()
}

/// Tabulates statistics, one row per year.
///
/// # Errors
/// Returns [`panel_core::PanelError::Frame`] if polars rejects the columns.
pub fn stats_frame(stats: &[YearStats]) -> panel_core::Result<DataFrame> {
    let column = |name: &str, f: &dyn Fn(&YearStats) -> Option<f64>| {
        Column::new(name.into(), stats.iter().map(f).collect::<Vec<_>>())
    };
    Ok(DataFrame::new(vec![
        Column::new("year".into(), stats.iter().map(|s| s.year).collect::<Vec<_>>()),
        Column::new(
            "count".into(),
            stats.iter().map(|s| s.count as u64).collect::<Vec<_>>(),
        ),
        column("mean", &|s| Some(s.mean)),
        column("std", &|s| s.std),
        column("min", &|s| Some(s.min)),
        column("25%", &|s| Some(s.q25)),
        column("50%", &|s| Some(s.median)),
        column("75%", &|s| Some(s.q75)),
        column("max", &|s| Some(s.max)),
        column("skewness", &|s| s.skewness),
        column("kurtosis", &|s| s.kurtosis),
        Column::new(
            "no_companies".into(),
            stats.iter().map(|s| s.companies as u64).collect::<Vec<_>>(),
        ),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_stats_match_sample_formulas() {
        let s = stats(2010, &[1.0, 2.0, 3.0, 4.0, 10.0], 5).unwrap();
        assert_relative_eq!(s.mean, 4.0);
        assert_relative_eq!(s.std.unwrap(), 12.5_f64.sqrt());
        assert_relative_eq!(s.median, 3.0);
        assert_relative_eq!(s.q25, 2.0);
        assert_relative_eq!(s.skewness.unwrap(), 1.69706, epsilon = 1e-4);
        assert_relative_eq!(s.kurtosis.unwrap(), 3.152, epsilon = 1e-4);
    }

    #[test]
    fn test_small_samples() {
        let s = stats(2010, &[5.0], 1).unwrap();
        assert!(s.std.is_none());
        assert!(s.skewness.is_none());
        assert_relative_eq!(s.max, 5.0);
        assert!(stats(2010, &[], 0).is_none());
    }

    #[test]
    fn test_describe_groups_by_year() {
        let obs = |entity: &str, year: i32, value: f64| {
            let date = NaiveDate::from_ymd_opt(year, 6, 30).unwrap();
            EntityObservation::new(EntityId::new(entity), date).with_field("TRESGS", value)
        };
        let result = describe_by_year(
            &[obs("A", 2011, 1.0), obs("A", 2010, 3.0), obs("B", 2010, 5.0)],
            "TRESGS",
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].year, 2010);
        assert_eq!(result[0].companies, 2);
        assert_relative_eq!(result[0].mean, 4.0);
        let frame = stats_frame(&result).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 12);
    }
}
