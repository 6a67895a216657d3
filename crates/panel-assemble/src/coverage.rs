//! Per-company data coverage across vendors.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use panel_core::{EntityId, EntityObservation, EntityProfile, EsgProvider, fields};

/// First and last dated observation of one vendor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Earliest observation date.
    pub first: NaiveDate,
    /// Latest observation date.
    pub last: NaiveDate,
}

impl Span {
    fn extend(span: Option<Self>, date: NaiveDate) -> Self {
        match span {
            Some(s) => Self {
                first: s.first.min(date),
                last: s.last.max(date),
            },
            None => Self {
                first: date,
                last: date,
            },
        }
    }
}

/// Coverage of one company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyCoverage {
    /// Company key.
    pub entity: EntityId,
    /// Company name from the reference data.
    pub name: Option<String>,
    /// Span of each ESG provider with data.
    pub esg: BTreeMap<EsgProvider, Span>,
    /// Span of the credit rating.
    pub rating: Option<Span>,
}

impl CompanyCoverage {
    /// Any ESG provider covers the company.
    #[must_use]
    pub fn esg_data(&self) -> bool {
        !self.esg.is_empty()
    }

    /// The company carries a rating and enters the analysis.
    #[must_use]
    pub const fn analyze(&self) -> bool {
        self.rating.is_some()
    }
}

fn spans(
    observations: &[EntityObservation],
    keep: impl Fn(&EntityObservation) -> bool,
) -> BTreeMap<&EntityId, Span> {
    let mut spans = BTreeMap::new();
    for observation in observations {
        if !keep(observation) {
            continue;
        }
        let span = spans.get(&observation.entity).copied();
        spans.insert(&observation.entity, Span::extend(span, observation.date));
    }
    spans
}

/// Coverage of every profiled company, in profile order.
///
/// An ESG observation counts when it carries any of the provider's score
/// fields; a rating observation counts when it carries a rating symbol.
#[must_use]
pub fn coverage(
    profiles: &[EntityProfile],
    esg: &BTreeMap<EsgProvider, Vec<EntityObservation>>,
    ratings: &[EntityObservation],
) -> Vec<CompanyCoverage> {
    let esg_spans: BTreeMap<EsgProvider, BTreeMap<&EntityId, Span>> = esg
        .iter()
        .map(|(provider, observations)| {
            let names = provider.fields();
            let spans = spans(observations, |o| names.iter().any(|n| o.get(n).is_some()));
            (*provider, spans)
        })
        .collect();
    let rating_spans = spans(ratings, |o| o.get(fields::RATING).is_some());

    profiles
        .iter()
        .map(|profile| CompanyCoverage {
            entity: profile.entity.clone(),
            name: profile.name.clone(),
            esg: esg_spans
                .iter()
                .filter_map(|(provider, spans)| {
                    spans.get(&profile.entity).map(|span| (*provider, *span))
                })
                .collect(),
            rating: rating_spans.get(&profile.entity).copied(),
        })
        .collect()
}

/// Tabulates coverage, one row per company.
///
/// # Errors
/// Returns [`panel_core::PanelError::Frame`] if polars rejects the columns.
pub fn coverage_frame(rows: &[CompanyCoverage]) -> panel_core::Result<DataFrame> {
    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string());
    let mut columns = vec![
        Column::new(
            fields::BB_TICKER.into(),
            rows.iter().map(|r| r.entity.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "name".into(),
            rows.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
        ),
    ];
    for provider in EsgProvider::ALL {
        let span = |r: &CompanyCoverage| r.esg.get(&provider).copied();
        columns.push(Column::new(
            format!("{provider}_first").into(),
            rows.iter().map(|r| date(span(r).map(|s| s.first))).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            format!("{provider}_last").into(),
            rows.iter().map(|r| date(span(r).map(|s| s.last))).collect::<Vec<_>>(),
        ));
    }
    columns.push(Column::new(
        "rating_first".into(),
        rows.iter().map(|r| date(r.rating.map(|s| s.first))).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "rating_last".into(),
        rows.iter().map(|r| date(r.rating.map(|s| s.last))).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "esg_data".into(),
        rows.iter().map(CompanyCoverage::esg_data).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "analyze".into(),
        rows.iter().map(CompanyCoverage::analyze).collect::<Vec<_>>(),
    ));
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::fields::refinitiv;

    fn obs(entity: &str, year: i32, month: u32) -> EntityObservation {
        EntityObservation::new(
            EntityId::new(entity),
            NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
        )
    }

    #[test]
    fn test_coverage_spans_and_flags() {
        let profiles = vec![
            EntityProfile::new(EntityId::new("A")).with_name("Alpha"),
            EntityProfile::new(EntityId::new("B")),
        ];
        let mut esg = BTreeMap::new();
        esg.insert(
            EsgProvider::Refinitiv,
            vec![
                obs("A", 2012, 3).with_field(refinitiv::ENV, 40.0),
                obs("A", 2009, 1).with_field(refinitiv::TOTAL, 50.0),
                obs("B", 2010, 1),
            ],
        );
        let ratings = vec![
            obs("A", 2008, 6).with_field(fields::RATING, "BBB"),
            obs("B", 2008, 6),
        ];

        let result = coverage(&profiles, &esg, &ratings);
        assert_eq!(result.len(), 2);
        let a = &result[0];
        let span = a.esg[&EsgProvider::Refinitiv];
        assert_eq!(span.first, NaiveDate::from_ymd_opt(2009, 1, 1).unwrap());
        assert_eq!(span.last, NaiveDate::from_ymd_opt(2012, 3, 1).unwrap());
        assert!(a.esg_data() && a.analyze());

        let b = &result[1];
        assert!(!b.esg_data());
        assert!(!b.analyze());
    }

    #[test]
    fn test_coverage_frame_columns() {
        let profiles = vec![EntityProfile::new(EntityId::new("A"))];
        let frame = coverage_frame(&coverage(&profiles, &BTreeMap::new(), &[])).unwrap();
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.width(), 2 + 2 * EsgProvider::ALL.len() + 4);
        assert!(frame.column("analyze").is_ok());
    }
}
