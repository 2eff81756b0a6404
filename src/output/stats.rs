//! Run summary statistics
//!
//! Collected while the orchestrator runs and printed at run completion (or
//! after an interrupt), so the operator sees per-shard distribution, throttle
//! pressure, and how much of the output came from a rehydrated checkpoint.

use chrono::{DateTime, Utc};

/// Per-shard crawl counters
#[derive(Debug, Clone)]
pub struct ShardSummary {
    /// Shard label from the plan
    pub label: String,

    /// Pages successfully fetched and processed
    pub pages: u64,

    /// Records newly accepted from this shard (after dedup)
    pub records: u64,

    /// Throttle signals observed while crawling this shard
    pub throttle_hits: u64,
}

impl ShardSummary {
    /// Creates an empty summary for a shard
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pages: 0,
            records: 0,
            throttle_hits: 0,
        }
    }
}

/// Summary of one harvester run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (completion, interrupt, or fatal abort)
    pub finished_at: Option<DateTime<Utc>>,

    /// Records rehydrated from a prior checkpoint before crawling
    pub initial_records: usize,

    /// Total records accumulated by the end of the run
    pub total_records: usize,

    /// Shards skipped per the configured start index
    pub skipped_shards: usize,

    /// Per-shard counters, in crawl order
    pub shards: Vec<ShardSummary>,

    /// Shards whose reported total exceeded the offset ceiling
    pub overflowed_shards: Vec<String>,

    /// Whether the run ended on a cancellation signal
    pub interrupted: bool,
}

impl RunSummary {
    /// Creates a summary for a run starting now
    pub fn new(initial_records: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            initial_records,
            total_records: initial_records,
            skipped_shards: 0,
            shards: Vec::new(),
            overflowed_shards: Vec::new(),
            interrupted: false,
        }
    }

    /// Records newly harvested this run (excluding rehydrated ones)
    pub fn new_records(&self) -> usize {
        self.total_records.saturating_sub(self.initial_records)
    }

    /// Total pages fetched across all shards
    pub fn total_pages(&self) -> u64 {
        self.shards.iter().map(|s| s.pages).sum()
    }

    /// Total throttle signals observed across all shards
    pub fn total_throttle_hits(&self) -> u64 {
        self.shards.iter().map(|s| s.throttle_hits).sum()
    }
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Overview:");
    println!("  Total records: {}", summary.total_records);
    if summary.initial_records > 0 {
        println!(
            "  Rehydrated from checkpoint: {} (new this run: {})",
            summary.initial_records,
            summary.new_records()
        );
    }
    println!("  Pages fetched: {}", summary.total_pages());
    if summary.skipped_shards > 0 {
        println!("  Shards skipped (already completed): {}", summary.skipped_shards);
    }
    if let Some(finished) = summary.finished_at {
        let elapsed = finished - summary.started_at;
        println!("  Elapsed: {}s", elapsed.num_seconds());
    }
    println!();

    println!("Records by Shard:");
    for shard in &summary.shards {
        let percentage = if summary.new_records() > 0 {
            (shard.records as f64 / summary.new_records() as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  {}: {} records, {} pages ({:.1}%)",
            shard.label, shard.records, shard.pages, percentage
        );
    }
    println!();

    if summary.total_throttle_hits() > 0 {
        println!("Throttling:");
        for shard in summary.shards.iter().filter(|s| s.throttle_hits > 0) {
            println!("  {}: {} throttle signals", shard.label, shard.throttle_hits);
        }
        println!();
    }

    if !summary.overflowed_shards.is_empty() {
        println!(
            "Shards over the offset ceiling ({}), re-split these boundaries:",
            summary.overflowed_shards.len()
        );
        for label in &summary.overflowed_shards {
            println!("  - {}", label);
        }
        println!();
    }

    if summary.interrupted {
        println!("Run was interrupted; rerun with start-shard set to resume.");
    }
}
