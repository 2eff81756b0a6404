//! Facet-Harvest: a resumable harvester for paginated search APIs
//!
//! This crate walks a paginated search endpoint shard by shard, staying under
//! the API's offset ceiling, deduplicating records across shards, and
//! persisting progress atomically so a multi-hour crawl survives interruption,
//! rate limiting, and transient network failure.

pub mod config;
pub mod harvest;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Facet-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fatal crawl error in shard '{shard}' at offset {offset}: {failure}")]
    FatalCrawl {
        shard: String,
        offset: u64,
        #[source]
        failure: harvest::FetchFailure,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] output::CheckpointError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Facet-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{FetchOutcome, PageFetcher, PageResult, ShardDefinition, ShardPlan};
pub use state::{CrawlState, OutputRecord, RateLimitState};
