//! Column names shared by every stage.

/// Company key column.
pub const BB_TICKER: &str = "BB_TICKER";
/// Calendar year column.
pub const YEAR: &str = "year";
/// Calendar month column.
pub const MONTH: &str = "month";
/// Reporting date column.
pub const DATE: &str = "Dates";

/// Industry classification.
pub const INDUSTRY: &str = "INDUSTRY";
/// Country of domicile.
pub const COUNTRY: &str = "COUNTRY";

/// Raw agency rating symbol.
pub const RATING: &str = "rating";
/// Rating outlook suffix.
pub const OUTLOOK: &str = "outlook";
/// Encoded rating.
pub const ORDINAL_RATING: &str = "ordinal_rating";
/// Investment / speculative grade.
pub const GRADE: &str = "grade";
/// Forward rating change.
pub const CREDIT_RTG_CHANGE: &str = "CREDIT_RTG_CHANGE";
/// ESG availability indicator.
pub const ESG_RATED: &str = "ESG_RATED";

/// Refinitiv ESG scores.
pub mod refinitiv {
    /// Governance pillar.
    pub const GOV: &str = "CGSCORE";
    /// Environmental pillar.
    pub const ENV: &str = "ENSCORE";
    /// Social pillar.
    pub const SOCIAL: &str = "SOSCORE";
    /// Total score.
    pub const TOTAL: &str = "TRESGS";
}

/// S&P Global (RobecoSAM) ESG scores.
pub mod spglobal {
    /// Economic dimension.
    pub const ECON: &str = "ROBECOSAM_ECON_DIMENSION_RANK";
    /// Environmental dimension.
    pub const ENV: &str = "ROBECOSAM_ENV_DIMENSION_RANK";
    /// Social dimension.
    pub const SOCIAL: &str = "ROBECOSAM_SOCIAL_DIMENSION_RANK";
    /// Total sustainability rank.
    pub const TOTAL: &str = "ROBECOSAM_TOTAL_STBLY_RANK";
}

/// Sustainalytics ESG scores.
pub mod sustainalytics {
    /// Environmental percentile.
    pub const ENV: &str = "SUSTAINALYTICS_ENVIRONMENT_PCT";
    /// Governance percentile.
    pub const GOV: &str = "SUSTAINALYTICS_GOVERNANCE_PCT";
    /// Social percentile.
    pub const SOCIAL: &str = "SUSTAINALYTICS_SOCIAL_PERCENTILE";
    /// Total rank.
    pub const TOTAL: &str = "SUSTAINALYTICS_RANK";
}

/// Accounting control variables.
pub mod control {
    /// Firm size.
    pub const SIZE: &str = "SIZE";
    /// Leverage.
    pub const LEVERAGE: &str = "LEVERAGE";
    /// Interest coverage ratio.
    pub const INTEREST_COVERAGE: &str = "INTEREST_COVERAGE_RATIO";
    /// Operating margin.
    pub const OPER_MARGIN: &str = "OPER_MARGIN";

    /// All control variables in regression order.
    pub const ALL: [&str; 4] = [SIZE, LEVERAGE, INTEREST_COVERAGE, OPER_MARGIN];
}

/// Entity summary columns.
pub mod summary {
    /// Number of non-zero rating changes.
    pub const CHANGES: &str = "CREDIT_RTG_CHANGE";
    /// Number of upgrades.
    pub const UPGRADE: &str = "upgrade";
    /// Number of downgrades.
    pub const DOWNGRADE: &str = "downgrade";
    /// Distinct years observed.
    pub const NO_YEARS: &str = "no_years";
    /// Average firm size.
    pub const AVG_SIZE: &str = "AVG_SIZE";
    /// Average leverage.
    pub const AVG_LEV: &str = "AVG_LEV";
    /// Average interest coverage.
    pub const AVG_ICOV: &str = "AVG_ICOV";
    /// Average operating margin.
    pub const AVG_OMAR: &str = "AVG_OMAR";
    /// Long-window flag.
    pub const LONG_TERM: &str = "LONG_TERM";
}

/// Prefix of year dummy columns.
pub const YEAR_DUMMY_PREFIX: &str = "year_";
/// Prefix of industry dummy columns.
pub const INDUSTRY_DUMMY_PREFIX: &str = "industry_";
/// Prefix of country dummy columns.
pub const COUNTRY_DUMMY_PREFIX: &str = "country_";
