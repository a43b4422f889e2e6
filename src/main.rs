use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use clickstream_gold::partition::discover_monthly_partitions;
use clickstream_gold::{
    DictionaryManager, GoldBuilder, PartialWindowPolicy, PartitionFilter, PipelineConfig,
    ProcessingStats, SpecificsEngine,
};

#[derive(Parser)]
#[command(name = "clickstream_gold")]
#[command(about = "Wikipedia clickstream Gold and Gold-Specifics builder")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Silver root (lang=xx/year=YYYY/month=MM/data.parquet)
    #[arg(long, global = true)]
    silver_dir: Option<PathBuf>,

    /// Gold root, also holds the article dictionaries
    #[arg(long, global = true)]
    gold_dir: Option<PathBuf>,

    /// Gold-Specifics output root
    #[arg(long, global = true)]
    specifics_dir: Option<PathBuf>,

    /// Number of parallel workers (default: all cores)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Build Gold fact tables from Silver partitions
    Gold,
    /// Derive Gold-Specifics tables from Gold
    Specifics,
    /// Gold, then Gold-Specifics
    All,
}

#[derive(Args)]
struct FilterArgs {
    /// Only this language edition
    #[arg(long, global = true)]
    lang: Option<String>,

    #[arg(long, global = true)]
    year: Option<i32>,

    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Only the most recent month among the selected partitions
    #[arg(long, global = true)]
    latest_month: bool,
}

#[derive(Args)]
struct ConfigOverrides {
    /// Leave Gold partitions whose tables already exist untouched
    #[arg(long, global = true)]
    skip_existing: bool,

    #[arg(long, global = true)]
    no_edges: bool,

    #[arg(long, global = true)]
    no_referrers: bool,

    #[arg(long, global = true)]
    top_n_articles: Option<usize>,

    #[arg(long, global = true)]
    top_n_referrers: Option<usize>,

    #[arg(long, global = true)]
    top_n_all_time: Option<usize>,

    #[arg(long, global = true)]
    top_n_trending: Option<usize>,

    #[arg(long, global = true)]
    top_n_edges: Option<usize>,

    #[arg(long, global = true)]
    rolling_window_months: Option<usize>,

    /// What to do with rolling windows shorter than configured
    #[arg(long, global = true, value_enum)]
    partial_windows: Option<PartialWindowPolicy>,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = &self.silver_dir {
            config.silver_dir = dir.clone();
        }
        if let Some(dir) = &self.gold_dir {
            config.gold_dir = dir.clone();
        }
        if let Some(dir) = &self.specifics_dir {
            config.specifics_dir = dir.clone();
        }

        let o = &self.overrides;
        config.skip_existing |= o.skip_existing;
        config.enable_edges &= !o.no_edges;
        config.enable_referrers &= !o.no_referrers;
        for (target, value) in [
            (&mut config.top_n_articles, o.top_n_articles),
            (&mut config.top_n_referrers, o.top_n_referrers),
            (&mut config.top_n_all_time, o.top_n_all_time),
            (&mut config.top_n_trending, o.top_n_trending),
            (&mut config.top_n_edges, o.top_n_edges),
            (&mut config.rolling_window_months, o.rolling_window_months),
        ] {
            if let Some(value) = value {
                *target = value;
            }
        }
        if let Some(policy) = o.partial_windows {
            config.partial_windows = policy;
        }

        config.validate()?;
        Ok(config)
    }

    fn partition_filter(&self) -> PartitionFilter {
        PartitionFilter {
            lang: self.filter.lang.clone(),
            year: self.filter.year,
            month: self.filter.month,
            latest_month: self.filter.latest_month,
        }
    }
}

fn run_gold(config: &PipelineConfig, filter: &PartitionFilter, stats: &ProcessingStats) -> Result<()> {
    if !config.silver_dir.is_dir() {
        bail!("Silver directory not found: {}", config.silver_dir.display());
    }
    let partitions = filter.apply(discover_monthly_partitions(&config.silver_dir)?);
    info!(
        "Found {} Silver partitions under {}",
        partitions.len(),
        config.silver_dir.display()
    );
    if partitions.is_empty() {
        warn!("Nothing to build");
        return Ok(());
    }

    let dictionaries = DictionaryManager::new(&config.gold_dir);
    let summary = GoldBuilder::new(config, &dictionaries, stats).run(partitions);
    info!(
        "GOLD: {} built, {} skipped, {} failed",
        summary.built,
        summary.skipped,
        summary.failed.len()
    );
    for (address, reason) in &summary.failed {
        warn!("  failed {}: {}", address, reason);
    }
    if summary.built + summary.skipped == 0 {
        bail!("no Gold partition was built");
    }
    Ok(())
}

fn run_specifics(config: &PipelineConfig, filter: &PartitionFilter, stats: &ProcessingStats) -> Result<()> {
    let summary = SpecificsEngine::new(config, stats).run(filter)?;
    info!(
        "GOLD_Specifics: {} languages, {} files, {} pruned, {} blocked, {} failed",
        summary.languages,
        summary.files_written,
        summary.files_pruned,
        summary.blocked,
        summary.failed.len()
    );
    for (lang, reason) in &summary.failed {
        warn!("  failed lang={}: {}", lang, reason);
    }
    if summary.languages == 0 && !summary.failed.is_empty() {
        bail!("no language could be derived");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Arc::new(cli.pipeline_config()?);
    let filter = cli.partition_filter();
    let command = cli.command;

    let max_workers = num_cpus::get();
    let num_workers = cli.workers.unwrap_or(max_workers).max(1);
    info!("Using {} workers (max available: {})", num_workers, max_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .thread_name(|i| format!("clickstream-worker-{}", i))
        .build_global()?;

    info!("Silver: {}", config.silver_dir.display());
    info!("Gold: {}", config.gold_dir.display());
    info!("Gold-Specifics: {}", config.specifics_dir.display());

    let stats = Arc::new(ProcessingStats::new());
    let task_stats = Arc::clone(&stats);
    tokio::task::spawn_blocking(move || -> Result<()> {
        if matches!(command, Command::Gold | Command::All) {
            run_gold(&config, &filter, &task_stats)?;
        }
        if matches!(command, Command::Specifics | Command::All) {
            run_specifics(&config, &filter, &task_stats)?;
        }
        Ok(())
    })
    .await??;

    stats.log_summary();
    Ok(())
}
