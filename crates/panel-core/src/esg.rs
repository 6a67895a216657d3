//! ESG rating providers and their score columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PanelError;
use crate::fields::{refinitiv, spglobal, sustainalytics};

/// An ESG rating provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsgProvider {
    /// Refinitiv ESG scores.
    Refinitiv,
    /// S&P Global (RobecoSAM) ranks, delivered through Bloomberg.
    SpGlobal,
    /// Sustainalytics ranks, delivered through Bloomberg.
    Sustainalytics,
}

impl EsgProvider {
    /// Every provider, in reporting order.
    pub const ALL: [Self; 3] = [Self::Refinitiv, Self::SpGlobal, Self::Sustainalytics];

    /// Lowercase name used for sheets and CLI flags.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Refinitiv => "refinitiv",
            Self::SpGlobal => "spglobal",
            Self::Sustainalytics => "sustainalytics",
        }
    }

    /// The total score column.
    #[must_use]
    pub const fn total(&self) -> &'static str {
        match self {
            Self::Refinitiv => refinitiv::TOTAL,
            Self::SpGlobal => spglobal::TOTAL,
            Self::Sustainalytics => sustainalytics::TOTAL,
        }
    }

    /// Total score followed by pillar scores.
    #[must_use]
    pub const fn fields(&self) -> [&'static str; 4] {
        match self {
            Self::Refinitiv => [
                refinitiv::TOTAL,
                refinitiv::ENV,
                refinitiv::SOCIAL,
                refinitiv::GOV,
            ],
            Self::SpGlobal => [
                spglobal::TOTAL,
                spglobal::ECON,
                spglobal::ENV,
                spglobal::SOCIAL,
            ],
            Self::Sustainalytics => [
                sustainalytics::TOTAL,
                sustainalytics::ENV,
                sustainalytics::GOV,
                sustainalytics::SOCIAL,
            ],
        }
    }

    /// Returns true if the provider is delivered inside the Bloomberg ESG export.
    #[must_use]
    pub const fn via_bloomberg(&self) -> bool {
        matches!(self, Self::SpGlobal | Self::Sustainalytics)
    }
}

impl fmt::Display for EsgProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EsgProvider {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "refinitiv" => Ok(Self::Refinitiv),
            "spglobal" | "robecosam" => Ok(Self::SpGlobal),
            "sustainalytics" => Ok(Self::Sustainalytics),
            other => Err(PanelError::InvalidParameter(format!(
                "unknown ESG provider {other:?}"
            ))),
        }
    }
}
