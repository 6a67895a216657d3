//! Command line driver for the ESG / credit rating panel.
//!
//! ```bash
//! panel --config panel.json clean
//! panel prepare --hypothesis h1 --provider refinitiv
//! panel prepare --hypothesis h2
//! panel regress --mode sub-periods
//! panel describe --provider sustainalytics
//! panel export --sheet h2_summary --out out/h2_summary.parquet
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use panel::{
    AnalysisMode, COVERAGE_SHEET, EsgProvider, ExportEngine, Hypothesis, PipelineConfig,
    ThesisPipeline, describe_sheet,
};

#[derive(Parser, Debug)]
#[command(name = "panel", version)]
#[command(about = "Build the ESG / credit rating panel and its regression inputs")]
struct Cli {
    /// JSON configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the raw export directory
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,

    /// Override the SQLite store path
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reload every raw export into the store
    Clean,
    /// Build and store the datasets of a hypothesis
    Prepare {
        /// Hypothesis to prepare
        #[arg(long, value_enum)]
        hypothesis: HypothesisArg,
        /// ESG provider for H1; every provider when omitted
        #[arg(long)]
        provider: Option<EsgProvider>,
    },
    /// Export the design matrices of an analysis mode
    Regress {
        /// Analysis mode
        #[arg(long, default_value = "main")]
        mode: AnalysisMode,
        /// Output directory; defaults to <output_dir>/models/<mode>
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Per-year statistics of a provider's total score
    Describe {
        /// ESG provider
        #[arg(long)]
        provider: EsgProvider,
        /// Output file; defaults to <output_dir>/describe_<provider>.csv
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// First and last observation per company and vendor
    Coverage {
        /// Output file; defaults to <output_dir>/coverage.csv
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a stored sheet to CSV or parquet
    Export {
        /// Sheet name, e.g. h1_refinitiv
        #[arg(long)]
        sheet: String,
        /// Output file; `.parquet` selects parquet
        #[arg(long)]
        out: PathBuf,
    },
    /// List stored sheets
    Sheets,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HypothesisArg {
    H1,
    H2,
}

impl From<HypothesisArg> for Hypothesis {
    fn from(arg: HypothesisArg) -> Self {
        match arg {
            HypothesisArg::H1 => Self::H1,
            HypothesisArg::H2 => Self::H2,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(raw_dir) = &cli.raw_dir {
        config.raw_dir.clone_from(raw_dir);
    }
    if let Some(store) = &cli.store {
        config.store_path = Some(store.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let output_dir = config.output_dir.clone();
    let mut pipeline = ThesisPipeline::open(config)
        .await
        .context("open pipeline")?;

    match cli.command {
        Command::Clean => {
            for (source, rows) in pipeline.clean().await.context("clean")? {
                println!("{source}\t{rows}");
            }
        }
        Command::Prepare {
            hypothesis,
            provider,
        } => {
            let sheets = pipeline
                .prepare(hypothesis.into(), provider)
                .await
                .with_context(|| format!("prepare {hypothesis:?}"))?;
            for sheet in sheets {
                println!("{sheet}");
            }
        }
        Command::Regress { mode, out } => {
            let dir = out.unwrap_or_else(|| output_dir.join("models").join(mode.name()));
            let engine = ExportEngine::new(&dir);
            let specs = pipeline
                .regress(mode, &engine)
                .await
                .with_context(|| format!("regress {mode}"))?;
            info!(models = specs.len(), dir = %dir.display(), "Exported models");
            println!("{}", serde_json::to_string_pretty(&specs)?);
        }
        Command::Describe { provider, out } => {
            let sheet = describe_sheet(provider);
            let frame = pipeline.describe(provider).await.context("describe")?;
            let out = out.unwrap_or_else(|| output_dir.join(format!("{sheet}.csv")));
            pipeline.export(&sheet, &out).await?;
            info!(years = frame.height(), out = %out.display(), "Wrote descriptive statistics");
        }
        Command::Coverage { out } => {
            let frame = pipeline.coverage().await.context("coverage")?;
            let out = out.unwrap_or_else(|| output_dir.join(format!("{COVERAGE_SHEET}.csv")));
            pipeline.export(COVERAGE_SHEET, &out).await?;
            info!(companies = frame.height(), out = %out.display(), "Wrote coverage report");
        }
        Command::Export { sheet, out } => {
            pipeline
                .export(&sheet, &out)
                .await
                .with_context(|| format!("export {sheet}"))?;
        }
        Command::Sheets => {
            for sheet in pipeline.store().sheets().await? {
                println!("{sheet}");
            }
        }
    }
    Ok(())
}
