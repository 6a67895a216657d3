//! Hand-off to an external estimation engine.

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::debug;

use panel_assemble::{DesignMatrix, write_csv};
use panel_core::{PanelError, Result};

/// Estimates the ordered-response model described by a design matrix.
///
/// No estimation happens in this workspace; implementations forward the
/// matrix to whatever runs the regression.
#[async_trait]
pub trait RegressionEngine: Send + Sync + Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Hands one model to the engine.
    async fn submit(&self, matrix: &DesignMatrix) -> Result<()>;
}

/// Writes each design matrix as `<model>.csv` and its spec as `<model>.json`.
#[derive(Clone, Debug)]
pub struct ExportEngine {
    dir: PathBuf,
}

impl ExportEngine {
    /// Creates an engine writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl RegressionEngine for ExportEngine {
    fn name(&self) -> &str {
        "export"
    }

    async fn submit(&self, matrix: &DesignMatrix) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = matrix.spec.name.clone();
        let frame = matrix.panel.to_frame()?;
        let csv_path = self.dir.join(format!("{name}.csv"));
        tokio::task::spawn_blocking(move || write_csv(&frame, &csv_path))
            .await
            .map_err(|e| PanelError::Other(e.to_string()))??;
        let spec = serde_json::to_string_pretty(&matrix.spec)
            .map_err(|e| PanelError::Other(e.to_string()))?;
        tokio::fs::write(self.dir.join(format!("{name}.json")), spec).await?;
        debug!(model = %name, rows = matrix.spec.observations, "Exported design matrix");
        Ok(())
    }
}
