//! Company reference sheet.

use tracing::debug;

use panel_core::{EntityId, EntityProfile, Result};

use crate::sheet::RawSheet;

/// Header of the ticker column.
pub const TICKER_HEADER: &str = "Fundamental Ticker Equity";

/// Parses the company reference into profiles.
///
/// Only the ticker column is required; `companyname`, `ID_ISIN`,
/// `companyid`, `INDUSTRY` and `COUNTRY` are read when present. Rows without a
/// ticker are skipped and a repeated ticker keeps its first row.
///
/// # Errors
/// Returns [`panel_core::PanelError::MissingColumn`] if the ticker column is absent.
pub fn parse_profiles(sheet: &RawSheet) -> Result<Vec<EntityProfile>> {
    let ticker_col = sheet.header_positions(&[TICKER_HEADER])?[0];
    let optional = |name: &str| sheet.header_position(name);
    let (name_col, isin_col, id_col, industry_col, country_col) = (
        optional("companyname"),
        optional("ID_ISIN"),
        optional("companyid"),
        optional("INDUSTRY"),
        optional("COUNTRY"),
    );
    let text = |row: usize, column: Option<usize>| column.and_then(|c| sheet.cell(row, c));

    let mut profiles: Vec<EntityProfile> = Vec::new();
    for (row, _) in sheet.rows_from(1) {
        let Some(ticker) = sheet.cell(row, ticker_col).map(EntityId::new) else {
            continue;
        };
        if profiles.iter().any(|p| p.entity == ticker) {
            continue;
        }
        profiles.push(EntityProfile {
            entity: ticker,
            name: text(row, name_col).map(str::to_string),
            isin: text(row, isin_col).map(str::to_string),
            company_id: text(row, id_col).map(str::to_string),
            industry: text(row, industry_col).map(str::to_string),
            country: text(row, country_col).map(str::to_string),
        });
    }
    debug!(sheet = sheet.name(), profiles = profiles.len(), "Read company reference");
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profiles() {
        let sheet = RawSheet::from_text(
            "company_info",
            &[
                vec![TICKER_HEADER, "ID_ISIN", "INDUSTRY", "COUNTRY"],
                vec!["VOD LN Equity", "GB00BH4HKS39", "Telecommunications", "United Kingdom"],
                vec!["", "XX", "Utilities", "France"],
                vec!["VOD LN Equity", "OTHER", "", ""],
            ],
        );
        let profiles = parse_profiles(&sheet).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].isin.as_deref(), Some("GB00BH4HKS39"));
        assert_eq!(profiles[0].country.as_deref(), Some("United Kingdom"));
        assert!(profiles[0].company_id.is_none());
    }

    #[test]
    fn test_ticker_column_required() {
        let sheet = RawSheet::from_text("company_info", &[vec!["ID_ISIN"]]);
        assert!(parse_profiles(&sheet).is_err());
    }
}
