use crate::harvest::ShardDefinition;
use crate::state::ThrottleResetPolicy;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Facet-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "shard")]
    pub shards: Vec<ShardDefinition>,
}

/// Upstream API contract configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the paginated search endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Base filter expression sent as the `q` parameter on every request
    pub query: String,

    /// Query parameter that carries the shard boundary expression
    #[serde(rename = "facet-param", default = "default_facet_param")]
    pub facet_param: String,

    /// Number of documents requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Maximum pagination offset the API supports reliably
    #[serde(rename = "max-offset", default = "default_max_offset")]
    pub max_offset: u64,

    /// JSON pointer to the stable record identifier within a document
    #[serde(rename = "id-pointer")]
    pub id_pointer: String,

    /// Static query parameters sent with every request
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Base pause between page fetches (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay")]
    pub politeness_delay_ms: u64,

    /// Upper bound of the random jitter added to the politeness pause (milliseconds)
    #[serde(rename = "jitter-ms", default = "default_jitter")]
    pub jitter_ms: u64,

    /// Maximum attempts for transport/HTTP failures outside the rate-limit class
    #[serde(rename = "retry-limit", default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Base delay for linear retry backoff (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Checkpoint every N pages within a shard
    #[serde(rename = "checkpoint-pages", default = "default_checkpoint_pages")]
    pub checkpoint_pages: u32,

    /// Base cooldown after a throttle signal (seconds)
    #[serde(rename = "rate-limit-base-secs", default = "default_rate_limit_base")]
    pub rate_limit_base_secs: u64,

    /// Cap on the throttle cooldown (seconds)
    #[serde(rename = "rate-limit-max-secs", default = "default_rate_limit_max")]
    pub rate_limit_max_secs: u64,

    /// Index of the first shard to crawl (skip shards that already ran)
    #[serde(rename = "start-shard", default)]
    pub start_shard: usize,

    /// When the throttle counter resets (per-shard or on-success)
    #[serde(rename = "throttle-reset", default)]
    pub throttle_reset: ThrottleResetPolicy,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the harvester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the atomically-replaced checkpoint artifact
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,
}

fn default_facet_param() -> String {
    "multiFacets".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_max_offset() -> u64 {
    5000
}

fn default_politeness_delay() -> u64 {
    1200
}

fn default_jitter() -> u64 {
    800
}

fn default_retry_limit() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1200
}

fn default_checkpoint_pages() -> u32 {
    5
}

fn default_rate_limit_base() -> u64 {
    60
}

fn default_rate_limit_max() -> u64 {
    900
}
