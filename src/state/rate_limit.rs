use crate::config::CrawlConfig;
use serde::Deserialize;
use std::time::Duration;

/// When the throttle counter resets within a shard
///
/// The upstream rations by request cadence, so a shard that saw throttling
/// arguably should stay in elevated backoff for its remainder (`PerShard`,
/// the observed upstream behavior). `OnSuccess` resets the counter on any
/// successful fetch, treating each rationing window as transient. This is a
/// policy knob, not a bug either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThrottleResetPolicy {
    /// Counter resets only when a new shard starts
    #[default]
    PerShard,

    /// Counter resets on every successful fetch
    OnSuccess,
}

/// Tracks throttle signals for one shard's crawl
///
/// Each 429/403 increments the counter; the cooldown grows linearly with the
/// count and is capped. Throttle handling never gives up — attempts are
/// unbounded, only the wait duration is bounded.
#[derive(Debug, Default)]
pub struct RateLimitState {
    consecutive_hits: u32,
}

impl RateLimitState {
    /// Creates a fresh state, as at shard start
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a throttle signal and returns the cooldown to apply
    pub fn record_throttle(&mut self, config: &CrawlConfig) -> Duration {
        self.consecutive_hits += 1;
        self.current_wait(config)
    }

    /// The cooldown for the current hit count: `min(cap, base * hits)`
    pub fn current_wait(&self, config: &CrawlConfig) -> Duration {
        let wait = config
            .rate_limit_base_secs
            .saturating_mul(self.consecutive_hits as u64)
            .min(config.rate_limit_max_secs);
        Duration::from_secs(wait)
    }

    /// Observes a successful fetch; resets the counter only under `OnSuccess`
    pub fn on_success(&mut self, policy: ThrottleResetPolicy) {
        if policy == ThrottleResetPolicy::OnSuccess {
            self.consecutive_hits = 0;
        }
    }

    /// Number of throttle signals recorded so far this shard
    pub fn hits(&self) -> u32 {
        self.consecutive_hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> CrawlConfig {
        CrawlConfig {
            politeness_delay_ms: 1200,
            jitter_ms: 800,
            retry_limit: 3,
            retry_delay_ms: 1200,
            checkpoint_pages: 5,
            rate_limit_base_secs: 60,
            rate_limit_max_secs: 900,
            start_shard: 0,
            throttle_reset: ThrottleResetPolicy::PerShard,
        }
    }

    #[test]
    fn test_new_state_has_no_hits() {
        let state = RateLimitState::new();
        assert_eq!(state.hits(), 0);
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let config = create_test_config();
        let mut state = RateLimitState::new();

        assert_eq!(state.record_throttle(&config), Duration::from_secs(60));
        assert_eq!(state.record_throttle(&config), Duration::from_secs(120));
        assert_eq!(state.record_throttle(&config), Duration::from_secs(180));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = create_test_config();
        let mut state = RateLimitState::new();

        // 16 hits at 60s base would be 960s without the 900s cap
        for _ in 0..16 {
            state.record_throttle(&config);
        }
        assert_eq!(state.current_wait(&config), Duration::from_secs(900));

        // Further hits stay pinned at the cap
        assert_eq!(state.record_throttle(&config), Duration::from_secs(900));
    }

    #[test]
    fn test_per_shard_policy_keeps_counter_across_success() {
        let config = create_test_config();
        let mut state = RateLimitState::new();

        state.record_throttle(&config);
        state.record_throttle(&config);
        state.record_throttle(&config);

        // A successful fetch mid-shard does not reset under PerShard
        state.on_success(ThrottleResetPolicy::PerShard);
        assert_eq!(state.hits(), 3);

        // A 4th throttle after a success still waits base * 4
        assert_eq!(state.record_throttle(&config), Duration::from_secs(240));
    }

    #[test]
    fn test_on_success_policy_resets_counter() {
        let config = create_test_config();
        let mut state = RateLimitState::new();

        state.record_throttle(&config);
        state.record_throttle(&config);
        state.record_throttle(&config);

        state.on_success(ThrottleResetPolicy::OnSuccess);
        assert_eq!(state.hits(), 0);

        // Next throttle starts over at base * 1
        assert_eq!(state.record_throttle(&config), Duration::from_secs(60));
    }
}
