//! The thesis pipeline: clean, populate, prepare, regress and report.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use polars::prelude::DataFrame;
use tracing::{debug, info, instrument, warn};

use panel_assemble::{
    AnalysisInputs, AnalysisMode, DatasetInputs, ModelSpec, Panel, coverage, coverage_frame,
    datasets::{self, sheets},
    describe_by_year, stats_frame, write_csv, write_parquet,
};
use panel_core::{
    BatchReport, Calendar, EntityProfile, EsgProvider, PanelError, ReportingFrequency, Result,
    TableStore,
};
use panel_etl::{
    BloombergEsg, BloombergWide, RatingFeeds, ReferenceSheet, RefinitivWide, SheetSource, sources,
};
use panel_series::{concat_rows, populate_all};
use panel_store::InMemoryStore;

use crate::config::PipelineConfig;
use crate::engine::RegressionEngine;
use crate::registry::SourceRegistry;

/// Sheet holding the coverage report.
pub const COVERAGE_SHEET: &str = "coverage";

/// Sheet holding a provider's descriptive statistics, e.g. `describe_refinitiv`.
#[must_use]
pub fn describe_sheet(provider: EsgProvider) -> String {
    format!("describe_{provider}")
}

/// Which hypothesis to prepare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hypothesis {
    /// ESG scores explain the rating level.
    H1,
    /// ESG coverage explains rating changes.
    H2,
}

/// Runs the stages of the study against one store.
///
/// Every stage reads what the previous stage stored: `clean` loads the raw
/// exports, `prepare` stores the hypothesis datasets, `regress` reads them
/// back. Stages can therefore run in separate invocations.
pub struct ThesisPipeline {
    config: PipelineConfig,
    registry: SourceRegistry,
    store: Arc<dyn TableStore>,
    reads_raw_files: bool,
}

impl std::fmt::Debug for ThesisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThesisPipeline")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("reads_raw_files", &self.reads_raw_files)
            .finish()
    }
}

#[cfg(feature = "store-sqlite")]
fn open_store(config: &PipelineConfig) -> Result<Arc<dyn TableStore>> {
    let Some(path) = &config.store_path else {
        return Ok(Arc::new(InMemoryStore::new()));
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(panel_store::SqliteStore::new(path)?))
}

#[cfg(not(feature = "store-sqlite"))]
fn open_store(config: &PipelineConfig) -> Result<Arc<dyn TableStore>> {
    if let Some(path) = &config.store_path {
        warn!(path = %path.display(), "Built without SQLite support, keeping tables in memory");
    }
    Ok(Arc::new(InMemoryStore::new()))
}

fn register_raw_sources(
    registry: &mut SourceRegistry,
    config: &PipelineConfig,
    profiles: Vec<EntityProfile>,
) {
    let files = &config.raw_files;
    let bloomberg_esg = config.raw_path(&files.bloomberg_esg);
    for provider in EsgProvider::ALL.into_iter().filter(EsgProvider::via_bloomberg) {
        registry.register_observations(Arc::new(SheetSource::new(
            provider.name(),
            &bloomberg_esg,
            Arc::new(BloombergEsg::new(BloombergWide::new(), provider)),
            ReportingFrequency::Monthly,
        )));
    }
    registry.register_observations(Arc::new(SheetSource::new(
        EsgProvider::Refinitiv.name(),
        config.raw_path(&files.refinitiv_esg),
        Arc::new(RefinitivWide::new(&profiles)),
        ReportingFrequency::Monthly,
    )));
    registry.register_observations(Arc::new(SheetSource::new(
        sources::CONTROLS,
        config.raw_path(&files.accounting),
        Arc::new(BloombergWide::new()),
        ReportingFrequency::Annual,
    )));
    registry.register_observations(Arc::new(RatingFeeds::new(
        config.raw_path(&files.supervisor_ratings),
        config.raw_path(&files.rating_changes),
        profiles,
        config.rating_scale,
    )));
}

impl ThesisPipeline {
    /// Creates a pipeline over `store` with an empty registry.
    ///
    /// Sources are added through [`registry_mut`](Self::registry_mut).
    #[must_use]
    pub fn new(config: PipelineConfig, store: Arc<dyn TableStore>) -> Self {
        Self {
            config,
            registry: SourceRegistry::with_store(store.clone()),
            store,
            reads_raw_files: false,
        }
    }

    /// Opens the configured store and registers the raw CSV exports.
    ///
    /// The company reference is read from the store when present, otherwise
    /// from the raw directory.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened or no company
    /// reference is available.
    #[instrument(skip(config), fields(raw_dir = %config.raw_dir.display()))]
    pub async fn open(config: PipelineConfig) -> Result<Self> {
        let store = open_store(&config)?;
        let mut pipeline = Self::new(config, store);
        pipeline.registry.register_reference(Arc::new(ReferenceSheet::new(
            pipeline.config.raw_path(&pipeline.config.raw_files.company_info),
        )));
        let profiles = pipeline.registry.fetch_profiles().await?;
        register_raw_sources(&mut pipeline.registry, &pipeline.config, profiles);
        pipeline.reads_raw_files = true;
        Ok(pipeline)
    }

    /// Pipeline settings.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Registered sources.
    #[must_use]
    pub const fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Registered sources, for adding or replacing one.
    pub fn registry_mut(&mut self) -> &mut SourceRegistry {
        &mut self.registry
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    fn calendar(&self) -> Result<Calendar> {
        self.config.calendar()
    }

    /// Reloads every source and overwrites the stored tables.
    ///
    /// Returns the number of observations stored per source.
    ///
    /// # Errors
    /// Propagates the first source or store error.
    #[instrument(skip(self))]
    pub async fn clean(&mut self) -> Result<BTreeMap<String, usize>> {
        let profiles = self.registry.refresh_profiles().await?;
        info!(profiles = profiles.len(), "Loaded company reference");
        if self.reads_raw_files {
            register_raw_sources(&mut self.registry, &self.config, profiles);
        }

        let names: Vec<String> = self
            .registry
            .source_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut counts = BTreeMap::new();
        for name in names {
            let rows = self.registry.refresh(&name).await?;
            counts.insert(name, rows);
        }
        info!(sources = counts.len(), "Cleaned sources");
        Ok(counts)
    }

    async fn populate_source(
        &self,
        name: &str,
        calendar: &Calendar,
        report: &mut BatchReport,
    ) -> Result<Panel> {
        let policy = self.registry.frequency(name)?.default_fill();
        let observations = self.registry.fetch_observations(name).await?;
        let (series, batch) = populate_all(calendar, policy, observations);
        debug!(source = name, entities = series.len(), "Populated source");
        report.merge(batch);
        Ok(Panel::from_rows(concat_rows(series)))
    }

    /// Populates every source over the study window.
    ///
    /// Each source is filled with the policy of its reporting frequency:
    /// ratings forward, annual controls backward and ESG scores as observed.
    /// ESG providers without a registered source are left out.
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] if ratings or controls are missing.
    #[instrument(skip(self))]
    pub async fn populate(&self) -> Result<(DatasetInputs, BatchReport)> {
        let calendar = self.calendar()?;
        let mut report = BatchReport::new();
        let ratings = self
            .populate_source(sources::RATINGS, &calendar, &mut report)
            .await?;
        let controls = self
            .populate_source(sources::CONTROLS, &calendar, &mut report)
            .await?;

        let registered = self.registry.source_names();
        let mut esg = BTreeMap::new();
        for provider in EsgProvider::ALL {
            if registered.contains(&provider.name()) {
                let panel = self
                    .populate_source(provider.name(), &calendar, &mut report)
                    .await?;
                esg.insert(provider, panel);
            }
        }

        let profiles = self.registry.fetch_profiles().await?;
        report.log("populate");
        Ok((
            DatasetInputs {
                ratings,
                controls,
                esg,
                profiles,
            },
            report,
        ))
    }

    async fn store_panel(&self, sheet: &str, panel: &Panel) -> Result<()> {
        self.store.put_frame(sheet, &panel.to_frame()?).await?;
        info!(sheet, rows = panel.len(), columns = panel.columns().len(), "Stored panel");
        Ok(())
    }

    /// Builds and stores the datasets of a hypothesis.
    ///
    /// H1 covers `provider` or, when `None`, every provider with a source.
    /// Returns the names of the stored sheets.
    ///
    /// # Errors
    /// Propagates population, assembly and store errors.
    #[instrument(skip(self))]
    pub async fn prepare(
        &self,
        hypothesis: Hypothesis,
        provider: Option<EsgProvider>,
    ) -> Result<Vec<String>> {
        let (inputs, _) = self.populate().await?;
        let mut stored = Vec::new();
        match hypothesis {
            Hypothesis::H1 => {
                let providers: Vec<EsgProvider> = match provider {
                    Some(provider) => vec![provider],
                    None => inputs.esg.keys().copied().collect(),
                };
                for provider in providers {
                    let sheet = sheets::h1(provider);
                    let (panel, report) = datasets::h1(&inputs, provider)?;
                    report.log(&sheet);
                    self.store_panel(&sheet, &panel).await?;
                    stored.push(sheet);
                }
            }
            Hypothesis::H2 => {
                let options = self.config.dataset_options();
                let (monthly, report) = datasets::h2_monthly(&inputs, &options)?;
                report.log(sheets::H2_MONTHLY);
                let (yearly, report) = datasets::h2_yearly(&inputs, &options)?;
                report.log(sheets::H2_YEARLY);
                let (summary, _) = datasets::h2_summary(&monthly, &options.summary)?;
                for (sheet, panel) in [
                    (sheets::H2_MONTHLY, &monthly),
                    (sheets::H2_YEARLY, &yearly),
                    (sheets::H2_SUMMARY, &summary),
                ] {
                    self.store_panel(sheet, panel).await?;
                    stored.push(sheet.to_string());
                }
            }
        }
        Ok(stored)
    }

    /// Reads a stored panel back.
    ///
    /// # Errors
    /// Returns [`PanelError::Store`] if the sheet has not been stored.
    pub async fn load_panel(&self, sheet: &str) -> Result<Panel> {
        let frame = self.store.get_frame(sheet).await?.ok_or_else(|| {
            PanelError::Store(format!("Sheet {sheet:?} has not been prepared"))
        })?;
        Panel::from_frame(&frame)
    }

    async fn optional_panel(&self, sheet: &str) -> Result<Option<Panel>> {
        match self.store.get_frame(sheet).await? {
            Some(frame) => Ok(Some(Panel::from_frame(&frame)?)),
            None => {
                warn!(sheet, "Dataset not prepared");
                Ok(None)
            }
        }
    }

    /// Loads the stored datasets the analyses draw from.
    ///
    /// Missing datasets stay empty; a mode that needs one fails when its
    /// design matrices are built.
    ///
    /// # Errors
    /// Propagates store and frame conversion errors.
    pub async fn analysis_inputs(&self) -> Result<AnalysisInputs> {
        let mut h1 = BTreeMap::new();
        for provider in EsgProvider::ALL {
            if let Some(panel) = self.optional_panel(&sheets::h1(provider)).await? {
                h1.insert(provider, panel);
            }
        }
        Ok(AnalysisInputs {
            h1,
            h2_monthly: self.optional_panel(sheets::H2_MONTHLY).await?.unwrap_or_default(),
            h2_yearly: self.optional_panel(sheets::H2_YEARLY).await?.unwrap_or_default(),
            h2_summary: self.optional_panel(sheets::H2_SUMMARY).await?.unwrap_or_default(),
            summary: self.config.summary.clone(),
        })
    }

    /// Builds the design matrices of `mode` and submits each to `engine`.
    ///
    /// # Errors
    /// Returns an error if a needed dataset is missing or the engine fails.
    #[instrument(skip(self, engine), fields(engine = engine.name()))]
    pub async fn regress(
        &self,
        mode: AnalysisMode,
        engine: &dyn RegressionEngine,
    ) -> Result<Vec<ModelSpec>> {
        let matrices = self.analysis_inputs().await?.design_matrices(mode)?;
        let mut specs = Vec::with_capacity(matrices.len());
        for matrix in &matrices {
            engine.submit(matrix).await?;
            specs.push(matrix.spec.clone());
        }
        info!(%mode, models = specs.len(), "Submitted design matrices");
        Ok(specs)
    }

    /// Per-year statistics of a provider's total score, stored under [`describe_sheet`].
    ///
    /// # Errors
    /// Returns [`PanelError::SourceNotConfigured`] if the provider has no source.
    #[instrument(skip(self))]
    pub async fn describe(&self, provider: EsgProvider) -> Result<DataFrame> {
        let observations = self.registry.fetch_observations(provider.name()).await?;
        let frame = stats_frame(&describe_by_year(&observations, provider.total()))?;
        self.store.put_frame(&describe_sheet(provider), &frame).await?;
        Ok(frame)
    }

    /// Per-company vendor coverage, stored under [`COVERAGE_SHEET`].
    ///
    /// # Errors
    /// Returns an error if the ratings or the company reference are unavailable.
    #[instrument(skip(self))]
    pub async fn coverage(&self) -> Result<DataFrame> {
        let profiles = self.registry.fetch_profiles().await?;
        let ratings = self.registry.fetch_observations(sources::RATINGS).await?;
        let registered = self.registry.source_names();
        let mut esg = BTreeMap::new();
        for provider in EsgProvider::ALL {
            if registered.contains(&provider.name()) {
                esg.insert(
                    provider,
                    self.registry.fetch_observations(provider.name()).await?,
                );
            }
        }
        let frame = coverage_frame(&coverage(&profiles, &esg, &ratings))?;
        self.store.put_frame(COVERAGE_SHEET, &frame).await?;
        Ok(frame)
    }

    /// Writes a stored sheet to `out`, as parquet for a `.parquet` path and CSV otherwise.
    ///
    /// # Errors
    /// Returns [`PanelError::Store`] for an unknown sheet and I/O errors from writing.
    #[instrument(skip(self), fields(out = %out.display()))]
    pub async fn export(&self, sheet: &str, out: &Path) -> Result<()> {
        let frame = self
            .store
            .get_frame(sheet)
            .await?
            .ok_or_else(|| PanelError::Store(format!("Sheet {sheet:?} not found")))?;
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let rows = frame.height();
        let path = out.to_path_buf();
        tokio::task::spawn_blocking(move || match path.extension().and_then(|e| e.to_str()) {
            Some("parquet") => write_parquet(&frame, &path),
            _ => write_csv(&frame, &path),
        })
        .await
        .map_err(|e| PanelError::Other(e.to_string()))??;
        info!(sheet, rows, "Exported sheet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReference, MemorySource};
    use chrono::NaiveDate;
    use panel_core::{EntityId, EntityObservation, fields};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn pipeline() -> ThesisPipeline {
        let config = PipelineConfig {
            start: (2010, 1),
            end: (2010, 12),
            store_path: None,
            ..Default::default()
        };
        let mut pipeline = ThesisPipeline::new(config, Arc::new(InMemoryStore::new()));
        let registry = pipeline.registry_mut();
        registry.register_reference(Arc::new(MemoryReference::new(vec![
            EntityProfile::new(EntityId::new("A"))
                .with_industry("Utilities")
                .with_country("France"),
        ])));
        registry.register_observations(Arc::new(MemorySource::new(
            sources::RATINGS,
            ReportingFrequency::Event,
            vec![
                EntityObservation::new(EntityId::new("A"), date(2009, 6, 1))
                    .with_field(fields::ORDINAL_RATING, 14.0),
            ],
        )));
        registry.register_observations(Arc::new(MemorySource::new(
            sources::CONTROLS,
            ReportingFrequency::Annual,
            vec![
                EntityObservation::new(EntityId::new("A"), date(2010, 12, 31))
                    .with_field(fields::control::SIZE, 10.0),
            ],
        )));
        pipeline
    }

    #[test]
    fn test_describe_sheet_name() {
        assert_eq!(describe_sheet(EsgProvider::Refinitiv), "describe_refinitiv");
    }

    #[tokio::test]
    async fn test_populate_uses_frequency_fill() {
        let (inputs, report) = pipeline().populate().await.unwrap();
        assert!(report.is_clean());
        // forward fill seeded before the window covers all of 2010
        assert_eq!(inputs.ratings.len(), 12);
        // one annual value fills its year
        assert_eq!(inputs.controls.len(), 12);
        assert!(inputs.esg.is_empty());
        assert_eq!(inputs.profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_clean_stores_every_source() {
        let mut pipeline = pipeline();
        let counts = pipeline.clean().await.unwrap();
        assert_eq!(counts[sources::RATINGS], 1);
        assert_eq!(counts[sources::CONTROLS], 1);
        assert!(pipeline.store().get_profiles().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unprepared_sheet() {
        let pipeline = pipeline();
        assert!(matches!(
            pipeline.load_panel(sheets::H2_MONTHLY).await,
            Err(PanelError::Store(_))
        ));
        assert!(
            pipeline
                .export("missing", Path::new("out.csv"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_describe_requires_source() {
        assert!(matches!(
            pipeline().describe(EsgProvider::Sustainalytics).await,
            Err(PanelError::SourceNotConfigured(_))
        ));
    }
}
