//! Output module for checkpoint persistence and run summaries
//!
//! # Components
//!
//! - `CheckpointWriter`: atomic write-then-rename persistence of the
//!   accumulated records, readable at any time by downstream tooling
//! - `RunSummary` / `ShardSummary`: counters emitted at run completion

mod checkpoint;
mod stats;

pub use checkpoint::{CheckpointError, CheckpointWriter};
pub use stats::{print_summary, RunSummary, ShardSummary};
