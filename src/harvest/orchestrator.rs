//! Crawl orchestrator - the top-level control loop
//!
//! Drives the shard plan page by page, including:
//! - Resetting throttle state at every shard start
//! - Advancing the offset by the documents actually returned
//! - Trusting the reported total as the authoritative stop signal
//! - Governor cooldowns on throttle signals (unbounded attempts)
//! - Transient empty-page retries at the same offset
//! - Checkpointing on cadence, shard boundaries, fatal aborts, and interrupts
//!
//! Strictly sequential: one page at a time, one shard at a time. All waits are
//! awaited sleeps on the single control task; the upstream rations by request
//! cadence, so parallel fetches would defeat the governor.

use crate::config::Config;
use crate::harvest::transform::RecordTransform;
use crate::harvest::{FetchOutcome, PageFetcher, ShardDefinition, ShardPlan, Sleeper};
use crate::output::{CheckpointWriter, RunSummary, ShardSummary};
use crate::state::{CrawlState, RateLimitState};
use crate::HarvestError;
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How many times an empty page before the reported total is treated as
/// transient before the shard is declared exhausted
const EMPTY_PAGE_RETRIES: u32 = 3;

/// How a shard crawl ended short of a fatal error
enum ShardEnd {
    /// All pages consumed (or the upstream stopped returning documents)
    Exhausted,

    /// A cancellation signal was observed at a loop boundary
    Interrupted,
}

/// Owns the crawl state and drives the shard plan to completion
pub struct Orchestrator<F: PageFetcher, S: Sleeper> {
    config: Config,
    plan: ShardPlan,
    fetcher: F,
    sleeper: S,
    transform: RecordTransform,
    state: CrawlState,
    checkpoint: CheckpointWriter,
    shutdown: Arc<AtomicBool>,
}

impl<F: PageFetcher, S: Sleeper> Orchestrator<F, S> {
    /// Creates an orchestrator over an explicit crawl state
    ///
    /// The state may be freshly created or rehydrated from a prior
    /// checkpoint; the orchestrator only ever appends to it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        plan: ShardPlan,
        fetcher: F,
        sleeper: S,
        transform: RecordTransform,
        state: CrawlState,
        checkpoint: CheckpointWriter,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            plan,
            fetcher,
            sleeper,
            transform,
            state,
            checkpoint,
            shutdown,
        }
    }

    /// Runs the full shard plan
    ///
    /// Returns the run summary on completion or cooperative interruption.
    /// A fatal fetch failure checkpoints everything accumulated so far and
    /// then propagates.
    pub async fn run(&mut self) -> Result<RunSummary, HarvestError> {
        let mut summary = RunSummary::new(self.state.len());
        tracing::info!(
            "Starting harvest: {} shards, {} records carried over",
            self.plan.len(),
            summary.initial_records
        );

        let shards: Vec<ShardDefinition> = self.plan.shards().to_vec();
        for (index, shard) in shards.iter().enumerate() {
            if index < self.plan.start_index() {
                tracing::info!(
                    "Skipping shard {} (index {}) per start-shard configuration",
                    shard.label,
                    index
                );
                summary.skipped_shards += 1;
                continue;
            }

            if self.cancelled() {
                tracing::info!("Cancellation requested; checkpointing and stopping");
                self.try_checkpoint("interrupt");
                summary.interrupted = true;
                break;
            }

            match self.crawl_shard(shard, &mut summary).await {
                Ok(ShardEnd::Exhausted) => {
                    self.try_checkpoint(&format!("{} complete", shard.label));
                }
                Ok(ShardEnd::Interrupted) => {
                    tracing::info!("Harvest interrupted; checkpoint written, shard {} left unfinished", shard.label);
                    self.try_checkpoint(&format!("{} interrupt", shard.label));
                    summary.interrupted = true;
                    break;
                }
                Err(e) => {
                    // Never lose already-harvested records to an unhandled
                    // failure: checkpoint before the error surfaces.
                    match self.checkpoint.persist(self.state.snapshot()) {
                        Ok(()) => tracing::info!(
                            "Checkpoint ({} fatal): persisted {} records",
                            shard.label,
                            self.state.len()
                        ),
                        Err(ce) => tracing::error!(
                            "Checkpoint on fatal abort failed as well: {}",
                            ce
                        ),
                    }
                    return Err(e);
                }
            }
        }

        summary.total_records = self.state.len();
        summary.finished_at = Some(Utc::now());

        // Final persist; at run completion a failure here is surfaced
        self.checkpoint.persist(self.state.snapshot())?;
        tracing::info!(
            "Checkpoint (final): persisted {} records to {}",
            self.state.len(),
            self.checkpoint.path().display()
        );

        Ok(summary)
    }

    /// Crawls one shard page by page until it is exhausted
    async fn crawl_shard(
        &mut self,
        shard: &ShardDefinition,
        summary: &mut RunSummary,
    ) -> Result<ShardEnd, HarvestError> {
        tracing::info!("=== Shard {} ({}) ===", shard.label, shard.facet);

        let page_size = self.config.api.page_size;
        let mut offset: u64 = 0;
        let mut page_index: u32 = 0;
        let mut total: Option<u64> = None;
        let mut consecutive_empty: u32 = 0;
        let mut throttle = RateLimitState::new();
        let mut shard_summary = ShardSummary::new(shard.label.clone());

        loop {
            if self.cancelled() {
                summary.shards.push(shard_summary);
                return Ok(ShardEnd::Interrupted);
            }

            tracing::debug!("Fetching page {} (offset={})", page_index + 1, offset);
            match self.fetcher.fetch(shard, offset, page_size).await {
                FetchOutcome::Throttled { status } => {
                    let wait = throttle.record_throttle(&self.config.crawl);
                    shard_summary.throttle_hits += 1;
                    tracing::warn!(
                        "Received {} (rate limit). Waiting {}s before retrying offset {} (hit {})",
                        status,
                        wait.as_secs(),
                        offset,
                        throttle.hits()
                    );
                    self.sleeper.sleep(wait).await;
                    // Same offset, unbounded attempts
                    continue;
                }

                FetchOutcome::Failed { attempts, failure } => {
                    tracing::error!(
                        "Fatal fetch failure in shard {} at offset {} after {} attempts: {}",
                        shard.label,
                        offset,
                        attempts,
                        failure
                    );
                    summary.shards.push(shard_summary);
                    return Err(HarvestError::FatalCrawl {
                        shard: shard.label.clone(),
                        offset,
                        failure,
                    });
                }

                FetchOutcome::Page(page) => {
                    throttle.on_success(self.config.crawl.throttle_reset);

                    if total.is_none() {
                        total = page.total;
                        if let Some(t) = total {
                            tracing::info!("Reported total results for {}: {}", shard.label, t);
                            if t > self.config.api.max_offset {
                                tracing::warn!(
                                    "Shard {} reports {} results, past the offset ceiling of {}; \
                                     results beyond the ceiling will be missed until the shard is re-split",
                                    shard.label,
                                    t,
                                    self.config.api.max_offset
                                );
                                summary.overflowed_shards.push(shard.label.clone());
                            }
                        }
                    }

                    if page.docs.is_empty() {
                        // An empty page short of the reported total is
                        // upstream flakiness, retried at the same offset
                        if let Some(t) = total {
                            if offset < t && consecutive_empty < EMPTY_PAGE_RETRIES {
                                consecutive_empty += 1;
                                let wait = Duration::from_millis(
                                    (self.config.crawl.politeness_delay_ms + 1000)
                                        * (consecutive_empty as u64 + 1),
                                );
                                tracing::warn!(
                                    "Empty page before reaching total; retrying offset {} after {:?} (attempt {}/{})",
                                    offset,
                                    wait,
                                    consecutive_empty,
                                    EMPTY_PAGE_RETRIES
                                );
                                self.sleeper.sleep(wait).await;
                                continue;
                            }
                        }

                        tracing::info!(
                            "No documents returned for shard {}, stopping shard",
                            shard.label
                        );
                        break;
                    }
                    consecutive_empty = 0;

                    let doc_count = page.docs.len() as u64;
                    let mut page_new: u64 = 0;
                    for doc in &page.docs {
                        if let Some(record) = (self.transform)(doc) {
                            if self.state.accept(record) {
                                page_new += 1;
                            }
                        }
                    }
                    shard_summary.pages += 1;
                    shard_summary.records += page_new;
                    tracing::info!(
                        "Page yielded {} new records (running total: {})",
                        page_new,
                        self.state.len()
                    );

                    if page_index > 0 && page_index % self.config.crawl.checkpoint_pages == 0 {
                        self.try_checkpoint(&format!("{} page {}", shard.label, page_index));
                    }

                    offset += doc_count;
                    page_index += 1;

                    if let Some(t) = total {
                        if offset >= t {
                            tracing::info!(
                                "Reached reported total for shard {}, stopping shard",
                                shard.label
                            );
                            break;
                        }
                    }

                    self.sleeper.sleep(self.politeness_pause()).await;
                }
            }
        }

        summary.shards.push(shard_summary);
        Ok(ShardEnd::Exhausted)
    }

    /// Base politeness delay plus random jitter
    fn politeness_pause(&self) -> Duration {
        let jitter_ms = self.config.crawl.jitter_ms;
        let jitter = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.config.crawl.politeness_delay_ms + jitter)
    }

    fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Best-effort checkpoint: a failure is reported and retried at the next
    /// scheduled opportunity, never fatal to the run
    fn try_checkpoint(&self, label: &str) {
        match self.checkpoint.persist(self.state.snapshot()) {
            Ok(()) => {
                tracing::info!("Checkpoint ({}): persisted {} records", label, self.state.len());
            }
            Err(e) => {
                tracing::error!(
                    "Checkpoint ({}) failed: {}; will retry at next opportunity",
                    label,
                    e
                );
            }
        }
    }

    /// The accumulated crawl state (primarily for tests and callers that
    /// want counts after a run)
    pub fn state(&self) -> &CrawlState {
        &self.state
    }
}
