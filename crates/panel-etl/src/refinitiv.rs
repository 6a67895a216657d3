//! Refinitiv (Eikon) wide exports.
//!
//! The first row carries company names, the second row `ISIN(CODE)` pairs such
//! as `GB00BH4HKS39(TRESGS)`, and the remaining rows a date followed by values.
//! Eikon stamps monthly values on the first day of the following month.

use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use tracing::debug;

use panel_core::{EntityId, EntityObservation, EntityProfile, FieldValue, PanelError, Result};

use crate::sheet::RawSheet;
use crate::transform::{LongTable, Transform};

const CODE_ROW: usize = 1;
const DATA_START: usize = 2;

/// Splits `ISIN(CODE)` into its parts.
#[must_use]
pub fn split_code(raw: &str) -> Option<(&str, &str)> {
    let (isin, code) = raw.trim().split_once('(')?;
    let code = code.trim_end_matches(')');
    (!isin.is_empty() && !code.is_empty()).then_some((isin.trim(), code.trim()))
}

/// Reshapes a Refinitiv export into (ticker, date) observations.
#[derive(Clone, Debug)]
pub struct RefinitivWide {
    tickers: HashMap<String, EntityId>,
    first_date: NaiveDate,
}

impl RefinitivWide {
    /// Creates the transform with the ISIN to ticker map of the company reference.
    ///
    /// Observations dated before 2006-01-01 (after the shift) are dropped.
    #[must_use]
    pub fn new(profiles: &[EntityProfile]) -> Self {
        let tickers = profiles
            .iter()
            .filter_map(|p| p.isin.as_ref().map(|isin| (isin.clone(), p.entity.clone())))
            .collect();
        Self {
            tickers,
            first_date: NaiveDate::from_ymd_opt(2006, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }

    /// Overrides the earliest kept date.
    #[must_use]
    pub const fn with_first_date(mut self, first_date: NaiveDate) -> Self {
        self.first_date = first_date;
        self
    }
}

impl Transform for RefinitivWide {
    fn name(&self) -> &str {
        "refinitiv"
    }

    fn transform(&self, sheet: &RawSheet) -> Result<Vec<EntityObservation>> {
        let mut unmapped = 0usize;
        let headers: Vec<Option<(&EntityId, &str)>> = (0..sheet.width())
            .map(|column| {
                if column == 0 {
                    return Ok(None);
                }
                let Some(raw) = sheet.cell(CODE_ROW, column) else {
                    return Ok(None);
                };
                let (isin, code) = split_code(raw).ok_or_else(|| {
                    PanelError::Parse(format!("{raw:?} in {} is not ISIN(CODE)", sheet.name()))
                })?;
                match self.tickers.get(isin) {
                    Some(ticker) => Ok(Some((ticker, code))),
                    None => {
                        unmapped += 1;
                        Ok(None)
                    }
                }
            })
            .collect::<Result<_>>()?;
        if unmapped > 0 {
            debug!(columns = unmapped, "Dropped Refinitiv columns without a ticker");
        }

        let mut table = LongTable::default();
        for (index, row) in sheet.rows_from(DATA_START) {
            let Some(raw_date) = row.first().and_then(|c| c.as_deref()) else {
                continue;
            };
            let Some(date) = sheet.row_date(index, "Date", raw_date) else {
                continue;
            };
            let date = date
                .checked_sub_days(Days::new(1))
                .ok_or_else(|| PanelError::InvalidRange(format!("{raw_date} has no previous day")))?;
            if date < self.first_date {
                continue;
            }
            for (cell, header) in row.iter().zip(&headers).skip(1) {
                let (Some((ticker, code)), Some(value)) =
                    (header, cell.as_deref().and_then(FieldValue::parse))
                else {
                    continue;
                };
                table.insert(ticker, date, code, value);
            }
        }

        let observations = table.into_observations();
        debug!(sheet = sheet.name(), observations = observations.len(), "Reshaped Refinitiv sheet");
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::fields::refinitiv;

    fn profiles() -> Vec<EntityProfile> {
        vec![EntityProfile::new(EntityId::new("VOD LN Equity")).with_isin("GB00BH4HKS39")]
    }

    fn export() -> RawSheet {
        RawSheet::from_text(
            "ESG Score",
            &[
                vec!["Name", "VODAFONE GROUP", "VODAFONE GROUP", "UNKNOWN CO"],
                vec!["Code", "GB00BH4HKS39(TRESGS)", "GB00BH4HKS39(ENSCORE)", "XX0000000000(TRESGS)"],
                vec!["2006-01-01", "40.5", "", "12"],
                vec!["2006-02-01", "41.0", "60", "13"],
            ],
        )
    }

    #[test]
    fn test_split_code() {
        assert_eq!(split_code("GB00BH4HKS39(TRESGS)"), Some(("GB00BH4HKS39", "TRESGS")));
        assert_eq!(split_code("TRESGS"), None);
        assert_eq!(split_code("(TRESGS)"), None);
    }

    #[test]
    fn test_refinitiv_shifts_and_maps() {
        let observations = RefinitivWide::new(&profiles()).transform(&export()).unwrap();
        // 2006-01-01 shifts into 2005 and is dropped; the unknown ISIN is dropped.
        assert_eq!(observations.len(), 1);
        let obs = &observations[0];
        assert_eq!(obs.entity.as_str(), "VOD LN EQUITY");
        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2006, 1, 31).unwrap());
        assert_eq!(obs.get(refinitiv::TOTAL), Some(&FieldValue::Number(41.0)));
        assert_eq!(obs.get(refinitiv::ENV), Some(&FieldValue::Number(60.0)));
    }

    #[test]
    fn test_refinitiv_skips_malformed_date_row() {
        let sheet = RawSheet::from_text(
            "ESG Score",
            &[
                vec!["Name", "VODAFONE GROUP"],
                vec!["Code", "GB00BH4HKS39(TRESGS)"],
                vec!["2006-02-01", "41.0"],
                vec!["#VALUE!", "42.0"],
                vec!["2006-03-01", "43.0"],
            ],
        );
        let observations = RefinitivWide::new(&profiles()).transform(&sheet).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1].get(refinitiv::TOTAL), Some(&FieldValue::Number(43.0)));
    }

    #[test]
    fn test_refinitiv_rejects_bad_code() {
        let sheet = RawSheet::from_text("ESG Score", &[vec!["Name", "X"], vec!["Code", "TRESGS"]]);
        assert!(matches!(
            RefinitivWide::new(&profiles()).transform(&sheet),
            Err(PanelError::Parse(_))
        ));
    }
}
