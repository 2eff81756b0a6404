//! Shard planning
//!
//! A shard is a bounded sub-query guaranteed to return fewer results than the
//! API's maximum-offset ceiling. The plan is static: shards come from config,
//! ordered, and are never re-split at runtime. Picking boundaries that
//! actually stay under the ceiling is the operator's job (probe the facet
//! counts up front); the orchestrator reports overflow when a shard turns out
//! to be too big, it does not re-plan.

use serde::Deserialize;

/// One bounded sub-query of the overall query space
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShardDefinition {
    /// Human-readable shard name used in logs and summaries
    pub label: String,

    /// Boundary expression sent verbatim as the facet parameter value
    pub facet: String,
}

/// An ordered sequence of shards covering the full query space
#[derive(Debug, Clone)]
pub struct ShardPlan {
    shards: Vec<ShardDefinition>,
    start_index: usize,
}

impl ShardPlan {
    /// Creates a plan from an ordered shard list and a starting index
    ///
    /// Shards before `start_index` are treated as already completed by a
    /// prior run and skipped.
    pub fn new(shards: Vec<ShardDefinition>, start_index: usize) -> Self {
        Self {
            shards,
            start_index,
        }
    }

    /// Total number of shards in the plan, including skipped ones
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Returns whether the plan contains no shards
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Index of the first shard to crawl
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// All shards in plan order with their indices
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ShardDefinition)> {
        self.shards.iter().enumerate()
    }

    /// The shards in plan order
    pub fn shards(&self) -> &[ShardDefinition] {
        &self.shards
    }
}
