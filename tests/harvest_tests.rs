//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the paginated search API and
//! drive the real fetcher and orchestrator end-to-end.

use facet_harvest::config::{ApiConfig, Config, CrawlConfig, OutputConfig, UserAgentConfig};
use facet_harvest::harvest::{
    id_pointer_transform, run_harvest, FetchOutcome, HttpFetcher, Orchestrator, PageFetcher,
    ShardDefinition, ShardPlan, Sleeper,
};
use facet_harvest::output::CheckpointWriter;
use facet_harvest::state::{CrawlState, ThrottleResetPolicy};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sleeper that returns immediately so tests never wait out a backoff
#[derive(Clone, Copy)]
struct NoWait;

impl Sleeper for NoWait {
    async fn sleep(&self, _duration: Duration) {}
}

/// Builds a test configuration pointed at the mock server
fn create_test_config(base_url: &str, checkpoint_path: &Path, shards: Vec<ShardDefinition>) -> Config {
    Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            query: "lds07,contains,test".to_string(),
            facet_param: "multiFacets".to_string(),
            page_size: 50,
            max_offset: 5000,
            id_pointer: "/id".to_string(),
            params: [("vid".to_string(), "TEST".to_string())].into_iter().collect(),
        },
        crawl: CrawlConfig {
            politeness_delay_ms: 10, // Very short for testing
            jitter_ms: 0,
            retry_limit: 3,
            retry_delay_ms: 10,
            checkpoint_pages: 5,
            rate_limit_base_secs: 1,
            rate_limit_max_secs: 5,
            start_shard: 0,
            throttle_reset: ThrottleResetPolicy::PerShard,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            checkpoint_path: checkpoint_path.to_string_lossy().into_owned(),
        },
        shards,
    }
}

fn shard(label: &str) -> ShardDefinition {
    ShardDefinition {
        label: label.to_string(),
        facet: format!("facet_searchcreationdate,include,{}", label),
    }
}

fn docs(range: std::ops::Range<u32>) -> Vec<serde_json::Value> {
    range
        .map(|i| json!({"id": format!("doc-{}", i), "title": format!("Title {}", i)}))
        .collect()
}

/// Mounts a page response for the given shard facet and offset
async fn mount_page(
    server: &MockServer,
    facet: &str,
    offset: u64,
    body: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(query_param("multiFacets", facet))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn build_orchestrator(
    config: Config,
    checkpoint: CheckpointWriter,
    state: CrawlState,
) -> Orchestrator<HttpFetcher<NoWait>, NoWait> {
    let plan = ShardPlan::new(config.shards.clone(), config.crawl.start_shard);
    let fetcher = HttpFetcher::new(
        config.api.clone(),
        &config.crawl,
        &config.user_agent,
        NoWait,
    )
    .expect("client build");
    Orchestrator::new(
        config,
        plan,
        fetcher,
        NoWait,
        id_pointer_transform("/id"),
        state,
        checkpoint,
        Arc::new(AtomicBool::new(false)),
    )
}

#[tokio::test]
async fn test_full_harvest_two_shards_with_dedup() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("1940s"), shard("1950s")];

    // Shard 1: 120 results in pages of 50, 50, 20
    mount_page(&server, &shards[0].facet, 0, json!({"docs": docs(0..50), "info": {"total": 120}})).await;
    mount_page(&server, &shards[0].facet, 50, json!({"docs": docs(50..100), "info": {"total": 120}})).await;
    mount_page(&server, &shards[0].facet, 100, json!({"docs": docs(100..120), "info": {"total": 120}})).await;

    // Shard 2: 30 results, 10 of which were already seen in shard 1
    mount_page(&server, &shards[1].facet, 0, json!({"docs": docs(110..140), "info": {"total": 30}})).await;

    let config = create_test_config(&server.uri(), &path, shards);
    let checkpoint = CheckpointWriter::new(&path);
    let mut orchestrator = build_orchestrator(config, checkpoint.clone(), CrawlState::new());

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.total_records, 140);
    assert_eq!(summary.shards[0].records, 120);
    assert_eq!(summary.shards[0].pages, 3);
    assert_eq!(summary.shards[1].records, 20);

    let persisted = checkpoint.load().unwrap().unwrap();
    assert_eq!(persisted.len(), 140);
}

#[tokio::test]
async fn test_server_error_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("1960s")];

    // First attempt returns 500; subsequent attempts succeed
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, &shards[0].facet, 0, json!({"docs": docs(0..10), "info": {"total": 10}})).await;

    let config = create_test_config(&server.uri(), &path, shards);
    let checkpoint = CheckpointWriter::new(&path);
    let mut orchestrator = build_orchestrator(config, checkpoint, CrawlState::new());

    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.total_records, 10);
}

#[tokio::test]
async fn test_malformed_payload_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("1970s")];

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance page</html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, &shards[0].facet, 0, json!({"docs": docs(0..5), "info": {"total": 5}})).await;

    let config = create_test_config(&server.uri(), &path, shards);
    let checkpoint = CheckpointWriter::new(&path);
    let mut orchestrator = build_orchestrator(config, checkpoint, CrawlState::new());

    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.total_records, 5);
}

#[tokio::test]
async fn test_throttle_then_recovery() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("1980s")];

    // Two 403s before the upstream lets us back in; the governor retries
    // without consuming the fetcher's bounded retry budget
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, &shards[0].facet, 0, json!({"docs": docs(0..10), "info": {"total": 10}})).await;

    let config = create_test_config(&server.uri(), &path, shards);
    let checkpoint = CheckpointWriter::new(&path);
    let mut orchestrator = build_orchestrator(config, checkpoint, CrawlState::new());

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.total_records, 10);
    assert_eq!(summary.shards[0].throttle_hits, 2);
}

#[tokio::test]
async fn test_persistent_failure_exhausts_retry_budget() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("1990s")];

    // Every request fails; the fetcher should give up after exactly
    // retry_limit attempts
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &path, shards.clone());
    let mut fetcher = HttpFetcher::new(
        config.api.clone(),
        &config.crawl,
        &config.user_agent,
        NoWait,
    )
    .unwrap();

    match fetcher.fetch(&shards[0], 0, 50).await {
        FetchOutcome::Failed { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_throttle_status_not_retried_by_fetcher() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("2000s")];

    // A 429 must surface after exactly one request; the fetcher's own retry
    // loop never touches the rate-limit class
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &path, shards.clone());
    let mut fetcher = HttpFetcher::new(
        config.api.clone(),
        &config.crawl,
        &config.user_agent,
        NoWait,
    )
    .unwrap();

    match fetcher.fetch(&shards[0], 0, 50).await {
        FetchOutcome::Throttled { status } => assert_eq!(status, 429),
        other => panic!("expected Throttled, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fatal_abort_leaves_checkpoint_with_prior_shard() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("1940s"), shard("1950s")];

    // Shard 1 succeeds; shard 2 always fails
    mount_page(&server, &shards[0].facet, 0, json!({"docs": docs(0..40), "info": {"total": 40}})).await;
    Mock::given(method("GET"))
        .and(query_param("multiFacets", shards[1].facet.clone()))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &path, shards);
    let checkpoint = CheckpointWriter::new(&path);
    let mut orchestrator = build_orchestrator(config, checkpoint.clone(), CrawlState::new());

    let result = orchestrator.run().await;
    assert!(result.is_err());

    // Everything harvested before the abort survives in the checkpoint
    let persisted = checkpoint.load().unwrap().unwrap();
    assert_eq!(persisted.len(), 40);
}

#[tokio::test]
async fn test_run_harvest_resumes_from_checkpoint_without_duplicates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest.json");

    let shards = vec![shard("2010s")];
    mount_page(&server, &shards[0].facet, 0, json!({"docs": docs(0..20), "info": {"total": 20}})).await;

    let config = create_test_config(&server.uri(), &path, shards);

    // First run harvests everything
    let shutdown = Arc::new(AtomicBool::new(false));
    let summary = run_harvest(config.clone(), false, shutdown.clone())
        .await
        .unwrap();
    assert_eq!(summary.total_records, 20);
    assert_eq!(summary.initial_records, 0);

    // Second run rehydrates and re-encounters the same documents; dedup
    // keeps the total stable
    let summary = run_harvest(config, false, shutdown).await.unwrap();
    assert_eq!(summary.initial_records, 20);
    assert_eq!(summary.total_records, 20);
    assert_eq!(summary.new_records(), 0);
}
