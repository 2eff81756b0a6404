//! Page fetcher
//!
//! This module issues the HTTP requests for the harvester, including:
//! - Building an HTTP client with a polite user agent string
//! - Composing the query/paginate/facet request for one page
//! - Bounded retry with linear backoff for transient failures
//! - Surfacing throttle signals (429/403) immediately, without retrying
//! - Decoding the paginated JSON payload into a `PageResult`

use crate::config::{ApiConfig, CrawlConfig, UserAgentConfig};
use crate::harvest::{ShardDefinition, Sleeper};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Cap on the per-attempt retry backoff
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(90);

/// One page of raw documents plus the authoritative total, if reported
#[derive(Debug, Clone)]
pub struct PageResult {
    /// Raw documents in the order the API returned them
    pub docs: Vec<Value>,

    /// Total result count for the shard, once the API reports it
    pub total: Option<u64>,
}

/// A fetch failure outside the rate-limit class
#[derive(Debug, Clone, Error)]
pub enum FetchFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Http(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Outcome of fetching one page, after the fetcher's own retry budget
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page was fetched and decoded
    Page(PageResult),

    /// The upstream signalled rationing (429/403); not retried internally
    Throttled {
        /// The HTTP status that carried the signal
        status: u16,
    },

    /// The retry budget was exhausted; fatal for the current shard
    Failed {
        /// Attempts made before giving up
        attempts: u32,
        /// The last failure observed
        failure: FetchFailure,
    },
}

/// The seam between the orchestrator and the network
///
/// Production uses [`HttpFetcher`]; tests inject scripted fetchers that
/// replay canned outcomes.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Fetches one page of the given shard at the given offset
    async fn fetch(&mut self, shard: &ShardDefinition, offset: u64, page_size: u32)
        -> FetchOutcome;
}

/// Expected payload shape of the paginated search endpoint
#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    docs: Vec<Value>,
    info: Option<ApiInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiInfo {
    total: Option<u64>,
}

/// A single attempt's failure, before retry classification
enum AttemptError {
    Throttled(u16),
    Retryable(FetchFailure),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP-backed page fetcher
///
/// Retries transport errors, malformed payloads, and non-throttle HTTP
/// statuses up to the configured bound with linearly increasing backoff
/// (`base * attempt`, capped). Throttle statuses are surfaced immediately so
/// the governor can apply its own, much longer cooldown policy.
pub struct HttpFetcher<S: Sleeper> {
    client: Client,
    api: ApiConfig,
    retry_limit: u32,
    retry_delay: Duration,
    sleeper: S,
}

impl<S: Sleeper> HttpFetcher<S> {
    /// Creates a fetcher from configuration
    pub fn new(
        api: ApiConfig,
        crawl: &CrawlConfig,
        user_agent: &UserAgentConfig,
        sleeper: S,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent)?;
        Ok(Self {
            client,
            api,
            retry_limit: crawl.retry_limit,
            retry_delay: Duration::from_millis(crawl.retry_delay_ms),
            sleeper,
        })
    }

    /// Query parameters for one page request
    fn page_params(
        &self,
        shard: &ShardDefinition,
        offset: u64,
        page_size: u32,
    ) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .api
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.push(("q".to_string(), self.api.query.clone()));
        params.push((self.api.facet_param.clone(), shard.facet.clone()));
        params.push(("offset".to_string(), offset.to_string()));
        params.push(("limit".to_string(), page_size.to_string()));
        params
    }

    /// Performs one request attempt and classifies its failure, if any
    async fn attempt(
        &self,
        shard: &ShardDefinition,
        offset: u64,
        page_size: u32,
    ) -> Result<PageResult, AttemptError> {
        let params = self.page_params(shard, offset, page_size);

        let response = self
            .client
            .get(&self.api.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(classify_transport(&e)))?;

        let status = response.status().as_u16();
        if status == 429 || status == 403 {
            return Err(AttemptError::Throttled(status));
        }
        if !response.status().is_success() {
            return Err(AttemptError::Retryable(FetchFailure::Http(status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Retryable(classify_transport(&e)))?;

        // Upstream inconsistency is observed in practice; an undecodable body
        // is treated as a retryable failure, not a fatal one.
        let page: ApiPage = serde_json::from_str(&body)
            .map_err(|e| AttemptError::Retryable(FetchFailure::Malformed(e.to_string())))?;

        Ok(PageResult {
            docs: page.docs,
            total: page.info.and_then(|info| info.total),
        })
    }
}

impl<S: Sleeper> PageFetcher for HttpFetcher<S> {
    async fn fetch(
        &mut self,
        shard: &ShardDefinition,
        offset: u64,
        page_size: u32,
    ) -> FetchOutcome {
        let mut last_failure = None;

        for attempt in 1..=self.retry_limit {
            match self.attempt(shard, offset, page_size).await {
                Ok(page) => return FetchOutcome::Page(page),
                Err(AttemptError::Throttled(status)) => {
                    return FetchOutcome::Throttled { status };
                }
                Err(AttemptError::Retryable(failure)) => {
                    tracing::warn!(
                        "Fetch attempt {}/{} failed at offset {}: {}",
                        attempt,
                        self.retry_limit,
                        offset,
                        failure
                    );
                    last_failure = Some(failure);

                    if attempt < self.retry_limit {
                        let backoff = (self.retry_delay * attempt).min(MAX_RETRY_BACKOFF);
                        self.sleeper.sleep(backoff).await;
                    }
                }
            }
        }

        FetchOutcome::Failed {
            attempts: self.retry_limit,
            failure: last_failure
                .unwrap_or_else(|| FetchFailure::Transport("no attempt made".to_string())),
        }
    }
}

/// Classifies a reqwest error into a transport-level failure description
fn classify_transport(error: &reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Transport("request timeout".to_string())
    } else if error.is_connect() {
        FetchFailure::Transport("connection failed".to_string())
    } else {
        FetchFailure::Transport(error.to_string())
    }
}
