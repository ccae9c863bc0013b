use std::path::PathBuf;

use anyhow::Result;
use brick_sync::datasets::DatasetKind;
use brick_sync::media::ImageCache;
use brick_sync::util::{env as env_util, logging};
use brick_sync::{orchestrator, Overrides, PipelineConfig};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "brick-sync", version, about = "Rebrickable dataset sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    // Allow `brick-sync --no-validate` without the explicit `run` subcommand.
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Download, enrich, validate and write datasets (default)
    Run(RunArgs),
    /// Print counts of cached image verdicts
    CacheStats {
        /// Cache file (defaults to BRICK_CACHE_PATH or <data-dir>/image_cache.json)
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    /// Output directory for JSON/TXT files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Image verdict cache file
    #[arg(long)]
    cache: Option<PathBuf>,
    /// Directory for temporary downloads
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Base URL of the dataset archives
    #[arg(long)]
    base_url: Option<String>,
    /// Read <name>.csv.zip archives from this directory instead of downloading
    #[arg(long)]
    source_dir: Option<PathBuf>,
    /// Restrict to these datasets (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    only: Vec<DatasetKind>,
    /// Skip image validation
    #[arg(long = "no-validate", action = ArgAction::SetTrue)]
    no_validate: bool,
    /// Maximum concurrent image probes
    #[arg(long)]
    concurrency: Option<usize>,
    /// Per-probe timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Log progress every N probes
    #[arg(long)]
    progress_every: Option<usize>,
    /// Parent-theme hops to walk (1 = immediate parent)
    #[arg(long)]
    parent_depth: Option<usize>,
}

impl From<RunArgs> for Overrides {
    fn from(a: RunArgs) -> Self {
        Overrides {
            data_dir: a.data_dir,
            cache_path: a.cache,
            work_dir: a.work_dir,
            base_url: a.base_url,
            source_dir: a.source_dir,
            datasets: a.only,
            no_validate: a.no_validate,
            concurrency: a.concurrency,
            timeout_secs: a.timeout_secs,
            progress_every: a.progress_every,
            parent_depth: a.parent_depth,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the subscriber so RUST_LOG from it applies.
    env_util::init_env();
    logging::init_tracing("info")?;
    env_util::bootstrap_cli("brick-sync");
    let cli = Cli::parse();

    match cli.command {
        Some(Command::CacheStats { cache }) => {
            let cfg = PipelineConfig::resolve(Overrides {
                cache_path: cache,
                ..Default::default()
            });
            let stats = ImageCache::load(&cfg.cache_path)?.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Some(Command::Run(args)) => execute(args).await?,
        None => execute(cli.run).await?,
    }
    Ok(())
}

async fn execute(args: RunArgs) -> Result<()> {
    let config = PipelineConfig::resolve(args.into());
    config.log_summary();
    let summary = orchestrator::run(&config).await?;
    info!(
        datasets = summary.datasets.len(),
        themes = summary.themes,
        "all datasets processed"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
