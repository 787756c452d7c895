//! Tender-Harvest main entry point
//!
//! This is the command-line interface for the listings harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tender_harvest::config::{load_config_with_hash, validate, Config};
use tender_harvest::output::print_statistics;
use tender_harvest::pipeline::{Pipeline, Stage};
use tender_harvest::session::SolverLauncher;
use tracing_subscriber::EnvFilter;

/// Tender-Harvest: a resumable harvester for session-gated listings
///
/// Passes the site's browser challenge once, collects every listing that
/// matches the filters, then fetches and parses each detail page with
/// checkpointed progress. Interrupted runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "tender-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable harvester for session-gated listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Title keyword
    #[arg(short, long)]
    keyword: Option<String>,

    /// Administrative region facet
    #[arg(short, long)]
    region: Option<String>,

    /// Business type facet
    #[arg(short, long)]
    biz_type: Option<String>,

    /// Information type facet
    #[arg(short, long)]
    info_type: Option<String>,

    /// Publish time facet
    #[arg(short, long)]
    time_period: Option<String>,

    /// Concurrent detail fetches
    #[arg(long)]
    concurrency: Option<u32>,

    /// Only harvest the links file
    #[arg(long, conflicts_with_all = ["details_only", "export_only", "stats", "dry_run"])]
    links_only: bool,

    /// Only fetch details for an existing links file
    #[arg(long, conflicts_with_all = ["links_only", "export_only", "stats", "dry_run"])]
    details_only: bool,

    /// Only rewrite the exports from the progress file
    #[arg(long, conflicts_with_all = ["links_only", "details_only", "stats", "dry_run"])]
    export_only: bool,

    /// Discard previous detail progress before fetching
    #[arg(long)]
    fresh: bool,

    /// Show statistics from the links and progress files and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Validate config and show what would run without touching the network
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn stage(&self) -> Stage {
        if self.links_only {
            Stage::LinksOnly
        } else if self.details_only {
            Stage::DetailsOnly
        } else if self.export_only {
            Stage::ExportOnly
        } else {
            Stage::All
        }
    }

    /// Applies the command-line overrides on top of the loaded config
    fn apply_overrides(&self, config: &mut Config) {
        let filter = &mut config.filter;
        for (value, target) in [
            (&self.keyword, &mut filter.keyword),
            (&self.region, &mut filter.region),
            (&self.biz_type, &mut filter.biz_type),
            (&self.info_type, &mut filter.info_type),
            (&self.time_period, &mut filter.time_period),
        ] {
            if let Some(value) = value {
                *target = value.trim().to_string();
            }
        }
        if let Some(concurrency) = self.concurrency {
            config.crawler.max_concurrent = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };
    cli.apply_overrides(&mut config);
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config, cli.stage());
        return Ok(());
    }

    let launcher = solver_launcher(&config);
    let pipeline = Pipeline::new(config, launcher)?;

    if cli.stats {
        let stats = pipeline.statistics()?;
        print_statistics(&stats);
        return Ok(());
    }

    let stage = cli.stage();
    tracing::info!("Starting run: {:?}", stage);
    match pipeline.run(stage, cli.fresh).await {
        Ok(()) => {
            tracing::info!("Run completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tender_harvest=info,warn"),
            1 => EnvFilter::new("tender_harvest=debug,info"),
            2 => EnvFilter::new("tender_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

#[cfg(feature = "chromium")]
fn solver_launcher(config: &Config) -> Box<dyn SolverLauncher> {
    Box::new(tender_harvest::session::ChromiumLauncher::new(
        config.bootstrap.headless,
        config.site.user_agent.clone(),
    ))
}

#[cfg(not(feature = "chromium"))]
fn solver_launcher(_config: &Config) -> Box<dyn SolverLauncher> {
    Box::new(tender_harvest::session::NoBackendLauncher)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, stage: Stage) {
    println!("=== Tender-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Search API: {}", config.site.api_url);
    println!("  Challenge page: {}", config.site.page_url);
    println!("  Challenge status: {}", config.site.challenge_status);

    println!("\nFilters:");
    println!("  Keyword: {}", display_or_all(&config.filter.keyword));
    println!("  Region: {}", display_or_all(&config.filter.region));
    println!("  Business type: {}", display_or_all(&config.filter.biz_type));
    println!("  Info type: {}", display_or_all(&config.filter.info_type));
    println!("  Time period: {}", display_or_all(&config.filter.time_period));
    println!("  Page size: {}", config.filter.page_size);

    println!("\nDetail fetching:");
    println!("  Max concurrent: {}", config.crawler.max_concurrent);
    println!("  Checkpoint interval: {}", config.crawler.checkpoint_interval);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max retries: {}", config.crawler.max_retries);

    println!("\nOutput:");
    println!("  Links: {}", config.output.links_path().display());
    println!("  Progress: {}", config.output.progress_path().display());
    println!("  Details: {}", config.output.details_json_path().display());
    println!("  CSV: {}", config.output.details_csv_path().display());
    println!("  Session: {}", config.output.session_path().display());

    println!("\n✓ Configuration is valid");
    println!("✓ Would run stage: {:?}", stage);
}

fn display_or_all(value: &str) -> &str {
    if value.is_empty() {
        "全部"
    } else {
        value
    }
}
