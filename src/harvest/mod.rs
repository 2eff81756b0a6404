//! Harvest module for walking the paginated search API
//!
//! This module contains the core harvesting logic, including:
//! - Page fetching with bounded retry and throttle classification
//! - The static shard plan
//! - The record transform seam
//! - Overall crawl orchestration and checkpoint triggering

mod fetcher;
mod orchestrator;
mod shards;
pub mod transform;

pub use fetcher::{
    build_http_client, FetchFailure, FetchOutcome, HttpFetcher, PageFetcher, PageResult,
};
pub use orchestrator::Orchestrator;
pub use shards::{ShardDefinition, ShardPlan};
pub use transform::{id_pointer_transform, RecordTransform};

use crate::config::Config;
use crate::output::{CheckpointWriter, RunSummary};
use crate::state::CrawlState;
use crate::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// The single suspension point of the control loop
///
/// All waits (politeness delay, retry backoff, throttle cooldown) go through
/// this seam so tests can observe backoff decisions without real waiting.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    /// Suspends the control task for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by tokio's timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs a complete harvest from configuration
///
/// This is the main entry point for the binary. It will:
/// 1. Rehydrate the crawl state from the prior checkpoint (unless `fresh`)
/// 2. Build the shard plan and HTTP fetcher
/// 3. Drive the orchestrator over every shard
/// 4. Persist the final checkpoint and return the run summary
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `fresh` - Ignore any existing checkpoint and start empty
/// * `shutdown` - Cooperative cancellation flag, observed at loop boundaries
pub async fn run_harvest(
    config: Config,
    fresh: bool,
    shutdown: Arc<AtomicBool>,
) -> Result<RunSummary> {
    let checkpoint = CheckpointWriter::new(&config.output.checkpoint_path);

    let state = if fresh {
        tracing::info!("Starting fresh harvest (ignoring any existing checkpoint)");
        CrawlState::new()
    } else {
        match checkpoint.load()? {
            Some(records) => {
                tracing::info!(
                    "Rehydrated {} records from {}",
                    records.len(),
                    checkpoint.path().display()
                );
                CrawlState::from_records(records)
            }
            None => {
                tracing::info!("No prior checkpoint found, starting empty");
                CrawlState::new()
            }
        }
    };

    let plan = ShardPlan::new(config.shards.clone(), config.crawl.start_shard);
    let transform = id_pointer_transform(&config.api.id_pointer);
    let fetcher = HttpFetcher::new(
        config.api.clone(),
        &config.crawl,
        &config.user_agent,
        TokioSleeper,
    )?;

    let mut orchestrator = Orchestrator::new(
        config,
        plan,
        fetcher,
        TokioSleeper,
        transform,
        state,
        checkpoint,
        shutdown,
    );

    orchestrator.run().await
}
