//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use panel_assemble::{DatasetOptions, SummaryConfig};
use panel_core::{Calendar, PanelError, RatingScale, Result};

/// File names of the raw exports, relative to [`PipelineConfig::raw_dir`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFiles {
    /// Company reference.
    pub company_info: String,
    /// Supervisor rating feed.
    pub supervisor_ratings: String,
    /// Bloomberg "Rating Changes" feed.
    pub rating_changes: String,
    /// Bloomberg yearly accounting export.
    pub accounting: String,
    /// Bloomberg ESG export (Sustainalytics and S&P Global).
    pub bloomberg_esg: String,
    /// Refinitiv ESG export.
    pub refinitiv_esg: String,
}

impl Default for RawFiles {
    fn default() -> Self {
        Self {
            company_info: "company_info.csv".to_string(),
            supervisor_ratings: "credit_rating.csv".to_string(),
            rating_changes: "rating_changes.csv".to_string(),
            accounting: "accounting.csv".to_string(),
            bloomberg_esg: "bloomberg_esg.csv".to_string(),
            refinitiv_esg: "refinitiv_esg.csv".to_string(),
        }
    }
}

/// Settings shared by every pipeline stage.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "raw_dir": "data/raw", "store_path": "data/panel.db", "rating_scale": "broad" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// First (year, month) of the study window.
    pub start: (i32, u32),
    /// Last (year, month) of the study window.
    pub end: (i32, u32),
    /// Directory holding the raw CSV exports.
    pub raw_dir: PathBuf,
    /// Raw export file names.
    pub raw_files: RawFiles,
    /// SQLite store file; `None` keeps every table in memory.
    pub store_path: Option<PathBuf>,
    /// Directory receiving exported sheets and model specs.
    pub output_dir: PathBuf,
    /// Scale used to encode rating symbols.
    pub rating_scale: RatingScale,
    /// Winsorization limits of the operating margin in H2 panels.
    pub winsorize: Option<(f64, f64)>,
    /// Summarizer settings of the H2 summary.
    pub summary: SummaryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start: (2006, 1),
            end: (2020, 12),
            raw_dir: PathBuf::from("data/raw"),
            raw_files: RawFiles::default(),
            store_path: Some(PathBuf::from("data/panel.db")),
            output_dir: PathBuf::from("data/out"),
            rating_scale: RatingScale::default(),
            winsorize: Some((0.01, 0.01)),
            summary: SummaryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns [`PanelError::Io`] if the file cannot be read and
    /// [`PanelError::Parse`] if it is not valid configuration JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    /// Returns [`PanelError::Parse`] on invalid JSON or an invalid window.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| PanelError::Parse(e.to_string()))?;
        config.calendar()?;
        Ok(config)
    }

    /// The monthly calendar of the study window.
    ///
    /// # Errors
    /// Returns [`PanelError::InvalidRange`] for an invalid month or reversed bounds.
    pub fn calendar(&self) -> Result<Calendar> {
        Calendar::from_bounds(self.start, self.end)
    }

    /// Full path of a raw export.
    #[must_use]
    pub fn raw_path(&self, file: &str) -> PathBuf {
        self.raw_dir.join(file)
    }

    /// Options of the dataset builders.
    #[must_use]
    pub fn dataset_options(&self) -> DatasetOptions {
        DatasetOptions {
            winsorize: self.winsorize,
            summary: self.summary.clone(),
        }
    }
}
