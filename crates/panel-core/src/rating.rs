//! Credit rating encoding.
//!
//! Agency symbols are mapped onto an ordinal scale where a higher value means
//! better credit quality. `NR` maps to [`NOT_RATED`] so later stages can drop it;
//! any symbol outside the table is an [`UnmappedSymbol`](PanelError::UnmappedSymbol) error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PanelError, Result};

/// Ordinal credit rating. Zero is reserved for "not rated".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrdinalRating(u8);

/// Sentinel for the `NR` symbol.
pub const NOT_RATED: OrdinalRating = OrdinalRating(0);

impl OrdinalRating {
    /// Wraps a raw ordinal value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw ordinal value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns true for the not-rated sentinel.
    #[must_use]
    pub const fn is_not_rated(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OrdinalRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Investment or speculative grade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    /// At or above `BBB-`.
    Investment,
    /// Below `BBB-`.
    Speculative,
}

impl Grade {
    /// Lowercase label used in exported tables.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Investment => "investment",
            Self::Speculative => "speculative",
        }
    }
}

/// Symbols of the S&P long-term scale, worst to best.
const NOTCHES: [&str; 21] = [
    "C", "CC", "CCC-", "CCC", "CCC+", "B-", "B", "B+", "BB-", "BB", "BB+", "BBB-", "BBB", "BBB+",
    "A-", "A", "A+", "AA-", "AA", "AA+", "AAA",
];

/// Ordinal scale used to encode agency symbols.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingScale {
    /// One step per notch: `D`/`SD` = 1 through `AAA` = 22.
    #[default]
    Notched,
    /// One step per letter band: `D`/`SD` = 1 through `AAA` = 9.
    Broad,
}

impl RatingScale {
    /// Encodes an agency symbol.
    ///
    /// Only the first whitespace-separated token is read, so outlook suffixes
    /// such as `"BBB+ *-"` are ignored.
    ///
    /// # Errors
    /// Returns [`PanelError::UnmappedSymbol`] for symbols outside the table.
    pub fn encode(&self, symbol: &str) -> Result<OrdinalRating> {
        let token = rating_symbol(symbol);
        if token == "NR" {
            return Ok(NOT_RATED);
        }
        if token == "D" || token == "SD" {
            return Ok(OrdinalRating(1));
        }
        let notch = NOTCHES
            .iter()
            .position(|s| *s == token)
            .ok_or_else(|| PanelError::UnmappedSymbol(symbol.to_string()))?;
        let value = match self {
            Self::Notched => notch + 2,
            Self::Broad => match notch {
                0 | 1 => 2,
                n => (n - 2) / 3 + 3,
            },
        };
        Ok(OrdinalRating(value as u8))
    }

    /// Lowest ordinal that counts as investment grade (`BBB-`).
    #[must_use]
    pub const fn investment_cutoff(&self) -> OrdinalRating {
        match self {
            Self::Notched => OrdinalRating(13),
            Self::Broad => OrdinalRating(6),
        }
    }

    /// Highest ordinal on the scale (`AAA`).
    #[must_use]
    pub const fn max(&self) -> OrdinalRating {
        match self {
            Self::Notched => OrdinalRating(22),
            Self::Broad => OrdinalRating(9),
        }
    }

    /// Grade of an encoded rating; `None` for [`NOT_RATED`].
    #[must_use]
    pub fn grade(&self, rating: OrdinalRating) -> Option<Grade> {
        if rating.is_not_rated() {
            None
        } else if rating >= self.investment_cutoff() {
            Some(Grade::Investment)
        } else {
            Some(Grade::Speculative)
        }
    }

    /// Encodes a symbol and grades it in one step.
    ///
    /// # Errors
    /// Returns [`PanelError::UnmappedSymbol`] for symbols outside the table.
    pub fn classify(&self, symbol: &str) -> Result<(OrdinalRating, Option<Grade>)> {
        let rating = self.encode(symbol)?;
        Ok((rating, self.grade(rating)))
    }
}

impl std::str::FromStr for RatingScale {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "notched" => Ok(Self::Notched),
            "broad" => Ok(Self::Broad),
            other => Err(PanelError::InvalidParameter(format!(
                "unknown rating scale {other:?}"
            ))),
        }
    }
}

/// The rating token of a raw agency string: first whitespace-separated word, uppercased.
#[must_use]
pub fn rating_symbol(raw: &str) -> String {
    raw.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}
