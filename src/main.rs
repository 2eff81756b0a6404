//! Facet-Harvest main entry point
//!
//! This is the command-line interface for the Facet-Harvest indexer.

use clap::Parser;
use facet_harvest::config::load_config_with_hash;
use facet_harvest::harvest::run_harvest;
use facet_harvest::output::{print_summary, CheckpointWriter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Facet-Harvest: a resumable harvester for paginated search APIs
///
/// Facet-Harvest walks a paginated search endpoint shard by shard, staying
/// under the API's offset ceiling, deduplicating records across shards, and
/// checkpointing progress atomically so an interrupted crawl can resume.
#[derive(Parser, Debug)]
#[command(name = "facet-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable sharded API harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore any existing checkpoint and start empty
    #[arg(long)]
    fresh: bool,

    /// Override the configured starting shard index (skip completed shards)
    #[arg(long, value_name = "INDEX")]
    start_shard: Option<usize>,

    /// Validate config and show the shard plan without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Inspect an existing checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(start_shard) = cli.start_shard {
        anyhow::ensure!(
            start_shard < config.shards.len(),
            "--start-shard {} is out of range for {} shards",
            start_shard,
            config.shards.len()
        );
        config.crawl.start_shard = start_shard;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("facet_harvest=info,warn"),
            1 => EnvFilter::new("facet_harvest=debug,info"),
            2 => EnvFilter::new("facet_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the shard plan
fn handle_dry_run(config: &facet_harvest::config::Config) {
    println!("=== Facet-Harvest Dry Run ===\n");

    println!("API:");
    println!("  Endpoint: {}", config.api.base_url);
    println!("  Query: {}", config.api.query);
    println!("  Page size: {}", config.api.page_size);
    println!("  Offset ceiling: {}", config.api.max_offset);

    println!("\nCrawl:");
    println!(
        "  Politeness delay: {}ms (+ up to {}ms jitter)",
        config.crawl.politeness_delay_ms, config.crawl.jitter_ms
    );
    println!("  Retry limit: {}", config.crawl.retry_limit);
    println!(
        "  Rate-limit cooldown: {}s base, {}s cap",
        config.crawl.rate_limit_base_secs, config.crawl.rate_limit_max_secs
    );
    println!("  Checkpoint every {} pages", config.crawl.checkpoint_pages);

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    println!("\nShard Plan ({}):", config.shards.len());
    for (index, shard) in config.shards.iter().enumerate() {
        let marker = if index < config.crawl.start_shard {
            " (skipped)"
        } else {
            ""
        };
        println!("  {}. {} -> {}{}", index, shard.label, shard.facet, marker);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} of {} shards",
        config.shards.len() - config.crawl.start_shard,
        config.shards.len()
    );
}

/// Handles the --stats mode: inspects an existing checkpoint
fn handle_stats(config: &facet_harvest::config::Config) -> anyhow::Result<()> {
    let writer = CheckpointWriter::new(&config.output.checkpoint_path);
    println!("Checkpoint: {}\n", writer.path().display());

    match writer.load()? {
        Some(records) => {
            println!("Records: {}", records.len());
            if let Some(first) = records.first() {
                println!("First id: {}", first.id);
            }
            if let Some(last) = records.last() {
                println!("Last id: {}", last.id);
            }
        }
        None => println!("No checkpoint found."),
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: facet_harvest::config::Config,
    fresh: bool,
) -> anyhow::Result<()> {
    tracing::info!(
        "Shards: {} (starting at index {}), page size {}",
        config.shards.len(),
        config.crawl.start_shard,
        config.api.page_size
    );

    // Cooperative cancellation: ctrl-c flips the flag, the orchestrator
    // observes it at loop boundaries and checkpoints before terminating
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; finishing current page and checkpointing");
            flag.store(true, Ordering::SeqCst);
        }
    });

    match run_harvest(config, fresh, shutdown).await {
        Ok(summary) => {
            print_summary(&summary);
            if summary.interrupted {
                tracing::info!("Harvest interrupted; progress checkpointed");
            } else {
                tracing::info!("Harvest completed successfully");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
