//! Bloomberg wide exports.
//!
//! A Bloomberg sheet has one block of columns per ticker. The ticker is only
//! written above the first column of its block, the row below the block
//! header names the field of every column, and the first column holds dates:
//!
//! ```text
//! row 3:            VOD LN Equity                 BARC LN Equity
//! row 5:  Dates     SUSTAINALYTICS_RANK  ...      SUSTAINALYTICS_RANK  ...
//! row 6:  2014-02-28  71                          55
//! ```

use std::collections::BTreeMap;
use tracing::debug;

use panel_core::{EntityId, EntityObservation, EsgProvider, FieldValue, Result};

use crate::sheet::RawSheet;
use crate::transform::{LongTable, Transform};

/// Row positions of a Bloomberg export, counted from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BloombergLayout {
    /// Row holding the ticker above each block.
    pub ticker_row: usize,
    /// Row holding the field name of each column.
    pub field_row: usize,
    /// First row of dated values.
    pub data_start: usize,
}

impl Default for BloombergLayout {
    fn default() -> Self {
        Self {
            ticker_row: 3,
            field_row: 5,
            data_start: 6,
        }
    }
}

/// Reshapes a Bloomberg wide export into (ticker, date) observations.
///
/// Empty cells and `#N/A` placeholders are dropped; numeric cells become
/// numbers and anything else is kept as text.
#[derive(Clone, Copy, Debug, Default)]
pub struct BloombergWide {
    layout: BloombergLayout,
}

impl BloombergWide {
    /// Creates a transform for the default layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform for a custom layout.
    #[must_use]
    pub const fn with_layout(layout: BloombergLayout) -> Self {
        Self { layout }
    }

    fn headers(&self, sheet: &RawSheet) -> Vec<Option<(EntityId, String)>> {
        let mut ticker: Option<EntityId> = None;
        (0..sheet.width())
            .map(|column| {
                if column == 0 {
                    return None;
                }
                if let Some(raw) = sheet.cell(self.layout.ticker_row, column) {
                    ticker = Some(EntityId::new(raw));
                }
                let field = sheet.cell(self.layout.field_row, column)?;
                ticker.clone().map(|t| (t, field.to_string()))
            })
            .collect()
    }
}

impl Transform for BloombergWide {
    fn name(&self) -> &str {
        "bloomberg"
    }

    fn transform(&self, sheet: &RawSheet) -> Result<Vec<EntityObservation>> {
        let headers = self.headers(sheet);
        let mut table = LongTable::default();

        for (index, row) in sheet.rows_from(self.layout.data_start) {
            let Some(raw_date) = row.first().and_then(|c| c.as_deref()) else {
                continue;
            };
            let Some(date) = sheet.row_date(index, "Dates", raw_date) else {
                continue;
            };
            for (cell, header) in row.iter().zip(&headers).skip(1) {
                let (Some((ticker, field)), Some(value)) =
                    (header, cell.as_deref().and_then(FieldValue::parse))
                else {
                    continue;
                };
                table.insert(ticker, date, field, value);
            }
        }

        let observations = table.into_observations();
        debug!(sheet = sheet.name(), observations = observations.len(), "Reshaped Bloomberg sheet");
        Ok(observations)
    }
}

/// Splits Bloomberg ESG observations by provider.
///
/// An observation belongs to a provider when it carries that provider's total
/// score; it keeps only that provider's score fields. Refinitiv is not part of
/// the Bloomberg export and is never produced here.
#[must_use]
pub fn split_providers(
    observations: &[EntityObservation],
) -> BTreeMap<EsgProvider, Vec<EntityObservation>> {
    let mut split: BTreeMap<EsgProvider, Vec<EntityObservation>> = BTreeMap::new();
    for provider in EsgProvider::ALL.into_iter().filter(EsgProvider::via_bloomberg) {
        let fields = provider.fields();
        let selected = observations
            .iter()
            .filter(|o| o.get(provider.total()).is_some())
            .map(|o| EntityObservation {
                entity: o.entity.clone(),
                date: o.date,
                fields: o
                    .fields
                    .iter()
                    .filter(|(name, _)| fields.contains(&name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            })
            .collect();
        split.insert(provider, selected);
    }
    split
}

/// One provider's part of the Bloomberg ESG export.
#[derive(Clone, Copy, Debug)]
pub struct BloombergEsg {
    wide: BloombergWide,
    provider: EsgProvider,
}

impl BloombergEsg {
    /// Creates the transform for a Bloomberg-delivered provider.
    #[must_use]
    pub const fn new(wide: BloombergWide, provider: EsgProvider) -> Self {
        Self { wide, provider }
    }
}

impl Transform for BloombergEsg {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn transform(&self, sheet: &RawSheet) -> Result<Vec<EntityObservation>> {
        let observations = self.wide.transform(sheet)?;
        Ok(split_providers(&observations)
            .remove(&self.provider)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use panel_core::fields::{spglobal, sustainalytics};

    fn export() -> RawSheet {
        RawSheet::from_text(
            "ESG SCORE",
            &[
                vec!["", "", "", ""],
                vec!["", "", "", ""],
                vec!["", "", "", ""],
                vec!["", "VOD LN Equity", "", "BARC LN Equity"],
                vec!["", "", "", ""],
                vec!["Dates", sustainalytics::TOTAL, spglobal::TOTAL, sustainalytics::TOTAL],
                vec!["2014-02-28", "71", "#N/A N/A", "55"],
                vec!["2014-03-31", "72", "80", ""],
                vec!["", "", "", ""],
            ],
        )
    }

    #[test]
    fn test_bloomberg_forward_fills_tickers() {
        let observations = BloombergWide::new().transform(&export()).unwrap();
        assert_eq!(observations.len(), 3);

        let barc = &observations[0];
        assert_eq!(barc.entity.as_str(), "BARC LN EQUITY");
        assert_eq!(barc.get(sustainalytics::TOTAL), Some(&FieldValue::Number(55.0)));

        let vod = &observations[2];
        assert_eq!(vod.date, NaiveDate::from_ymd_opt(2014, 3, 31).unwrap());
        assert_eq!(vod.get(spglobal::TOTAL), Some(&FieldValue::Number(80.0)));
        assert!(observations[1].get(spglobal::TOTAL).is_none());
    }

    #[test]
    fn test_malformed_date_skips_only_its_row() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["", ""]; 6];
        rows[3] = vec!["", "A"];
        rows[5] = vec!["Dates", "x"];
        rows.push(vec!["2014-01-31", "1"]);
        rows.push(vec!["yesterday", "2"]);
        rows.push(vec!["2014-03-31", "3"]);
        let sheet = RawSheet::from_text("bad", &rows);
        let observations = BloombergWide::new().transform(&sheet).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1].get("x"), Some(&FieldValue::Number(3.0)));
    }

    #[test]
    fn test_split_providers() {
        let observations = BloombergWide::new().transform(&export()).unwrap();
        let split = split_providers(&observations);
        assert!(!split.contains_key(&EsgProvider::Refinitiv));
        assert_eq!(split[&EsgProvider::Sustainalytics].len(), 3);
        let sp = &split[&EsgProvider::SpGlobal];
        assert_eq!(sp.len(), 1);
        assert!(sp[0].get(sustainalytics::TOTAL).is_none());

        let only_sp = BloombergEsg::new(BloombergWide::new(), EsgProvider::SpGlobal)
            .transform(&export())
            .unwrap();
        assert_eq!(only_sp, *sp);
    }
}
