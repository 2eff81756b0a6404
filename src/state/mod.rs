//! State module for tracking harvest progress
//!
//! This module provides state management for the crawl accumulation and
//! rate-limit tracking.
//!
//! # Components
//!
//! - `CrawlState`: The dedup and accumulation store (records plus seen ids)
//! - `OutputRecord`: The transformed, de-duplicated unit of output
//! - `RateLimitState`: Per-shard throttle tracking that drives backoff

mod crawl_state;
mod rate_limit;

// Re-export main types
pub use crawl_state::{CrawlState, OutputRecord};
pub use rate_limit::{RateLimitState, ThrottleResetPolicy};
