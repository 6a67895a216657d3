//! Reporting frequency and fill policy definitions.
//!
//! This module defines [`ReportingFrequency`] for the cadence at which a source
//! publishes values and [`FillPolicy`] for how sparse values are spread over the
//! monthly calendar.

use serde::{Deserialize, Serialize};

/// How missing months are filled when a series is aligned to the calendar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPolicy {
    /// Carry the last known value of each field forward until the next observation.
    #[default]
    Forward,
    /// Carry the last observation forward as a whole record; a new
    /// observation replaces every carried field, including ones it lacks.
    Replace,
    /// Take the next known value; an annual value covers its whole year.
    Backward,
    /// Keep only months that were actually observed.
    AsObserved,
}

/// Cadence at which a source publishes values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingFrequency {
    /// Published on rating actions only.
    Event,
    /// Monthly scores.
    Monthly,
    /// Annual accounting data.
    Annual,
}

impl ReportingFrequency {
    /// The fill policy conventionally used for this cadence.
    #[must_use]
    pub const fn default_fill(&self) -> FillPolicy {
        match self {
            Self::Event => FillPolicy::Replace,
            Self::Monthly => FillPolicy::AsObserved,
            Self::Annual => FillPolicy::Backward,
        }
    }

    /// Returns true if values persist until replaced.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        matches!(self, Self::Event | Self::Annual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fill() {
        assert_eq!(ReportingFrequency::Event.default_fill(), FillPolicy::Replace);
        assert_eq!(ReportingFrequency::Annual.default_fill(), FillPolicy::Backward);
        assert_eq!(ReportingFrequency::Monthly.default_fill(), FillPolicy::AsObserved);
        assert!(!ReportingFrequency::Monthly.is_persistent());
    }
}
