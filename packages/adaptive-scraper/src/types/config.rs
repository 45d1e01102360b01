//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the whole engine.
///
/// The acceptance threshold and the relearn trigger are configuration,
/// not fixed behavior; the defaults below are starting points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum confidence for a result to be accepted. Default: 0.6.
    pub accept_threshold: f64,

    /// Consecutive failures on a cached strategy before the next call
    /// relearns. Default: 3.
    pub relearn_after: u32,

    /// Upper bound on concurrently processed extraction requests.
    /// Default: 8.
    pub max_workers: usize,

    /// Cap on extracted records per page. Default: 50.
    pub max_records_per_page: usize,

    /// Timeout handed to the page fetcher. Default: 20 s.
    pub fetch_timeout: Duration,

    /// Deadline for one extraction request (strategy application or the
    /// full learner chain). Default: 45 s.
    pub request_timeout: Duration,

    /// TTL after which a cached strategy must be revalidated.
    /// Default: 30 days.
    pub strategy_ttl: Duration,

    /// Confidence scorer tunables.
    pub score: ScoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.6,
            relearn_after: 3,
            max_workers: 8,
            max_records_per_page: 50,
            fetch_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(45),
            strategy_ttl: Duration::from_secs(30 * 24 * 3600),
            score: ScoreConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acceptance threshold.
    pub fn with_accept_threshold(mut self, threshold: f64) -> Self {
        self.accept_threshold = threshold;
        self
    }

    /// Set the relearn trigger.
    pub fn with_relearn_after(mut self, failures: u32) -> Self {
        self.relearn_after = failures;
        self
    }

    /// Set the worker-pool bound.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Set the per-page record cap.
    pub fn with_max_records_per_page(mut self, max: usize) -> Self {
        self.max_records_per_page = max;
        self
    }

    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the strategy TTL.
    pub fn with_strategy_ttl(mut self, ttl: Duration) -> Self {
        self.strategy_ttl = ttl;
        self
    }

    /// Set the scorer tunables.
    pub fn with_score(mut self, score: ScoreConfig) -> Self {
        self.score = score;
        self
    }
}

/// Tunables for the confidence scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Record count at which the volume component saturates. Default: 3.
    pub expected_min_records: usize,

    /// Upper bound of the sane price band. Default: 1,000,000.
    pub max_plausible_price: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            expected_min_records: 3,
            max_plausible_price: 1_000_000.0,
        }
    }
}
