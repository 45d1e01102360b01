//! Strategy resolution - the per-domain state machine.
//!
//! Lifecycle: `UNSEEN → LEARNING → CACHED ⇄ DEGRADED → RELEARNING → CACHED`.
//! The durable side of the state lives in the store (strategy presence,
//! health counters, cache key); LEARNING and RELEARNING are the in-call
//! phases that run the chain. A strategy is only ever persisted from a
//! learner attempt that cleared the acceptance threshold, so an aborted
//! request can never leave a half-written domain behind.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::learners::{ChainAttempt, LearnerChain, METHOD_SET_VERSION};
use crate::pipeline::score::score;
use crate::traits::store::StrategyStore;
use crate::types::{
    config::EngineConfig,
    domain::Domain,
    page::RenderedPage,
    product::ExtractionResult,
    strategy::{LearnerMethod, StrategyRecord},
};

/// Where a domain stands before an extraction request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    /// No usable strategy: never learned, invalidated, or stale cache key
    Unseen,
    /// Healthy stored strategy, applied directly
    Cached,
    /// Stored strategy with recent failures, still applied
    Degraded,
    /// Consecutive failures crossed the threshold; this call relearns
    Relearning,
}

impl DomainState {
    /// Classify a domain from its stored record.
    pub fn classify(record: Option<&StrategyRecord>, config: &EngineConfig) -> Self {
        let Some(record) = record else {
            return Self::Unseen;
        };
        if !record
            .cache
            .is_current(&record.strategy.domain, METHOD_SET_VERSION)
        {
            // Learner set changed since this strategy was cached
            return Self::Unseen;
        }
        if record.health.consecutive_failures >= config.relearn_after {
            return Self::Relearning;
        }
        if record.health.consecutive_failures > 0 {
            return Self::Degraded;
        }
        Self::Cached
    }
}

/// Selects, validates, and (re)learns strategies for one domain at a time.
///
/// Callers must serialize invocations per domain; that is the
/// coordinator's job, not re-checked here.
pub struct StrategyResolver<S: StrategyStore> {
    store: Arc<S>,
    chain: LearnerChain,
    config: EngineConfig,
}

impl<S: StrategyStore> StrategyResolver<S> {
    /// Create a resolver over a store and a learner chain.
    pub fn new(store: Arc<S>, chain: LearnerChain, config: EngineConfig) -> Self {
        Self {
            store,
            chain,
            config,
        }
    }

    /// Resolve one extraction request for a domain.
    pub async fn resolve(&self, domain: &Domain, page: &RenderedPage) -> Result<ExtractionResult> {
        let record = self.store.get(domain).await?;
        let state = DomainState::classify(record.as_ref(), &self.config);

        match (state, record) {
            (DomainState::Relearning, Some(record)) => self.relearn(domain, page, &record).await,
            (DomainState::Cached | DomainState::Degraded, Some(record)) => {
                self.apply_stored(domain, page, &record).await
            }
            _ => {
                info!(domain = %domain, "no usable strategy, learning");
                self.learn(domain, page).await
            }
        }
    }

    /// Run the full chain and persist the winner, if any.
    async fn learn(&self, domain: &Domain, page: &RenderedPage) -> Result<ExtractionResult> {
        let outcome = self
            .chain
            .run(
                page,
                &self.config.score,
                self.config.accept_threshold,
                self.config.max_records_per_page,
            )
            .await;

        match outcome.winner {
            Some(attempt) => {
                let strategy = self
                    .store
                    .put(domain, attempt.draft, METHOD_SET_VERSION)
                    .await?;
                self.store.record_outcome(domain, true).await?;
                info!(
                    domain = %domain,
                    method = %strategy.method,
                    version = strategy.version,
                    "persisted learned strategy"
                );
                Ok(attempt.result)
            }
            None => {
                warn!(domain = %domain, "all learners below threshold, nothing persisted");
                Ok(best_effort(outcome.best))
            }
        }
    }

    /// Re-run the chain for a persistently failing domain.
    ///
    /// A success supersedes the stored strategy (new version, health
    /// reset); a failure leaves everything exactly as it was, so the
    /// next incoming request retries. At most one relearn runs per
    /// request - repeated DEGRADED calls are the retry loop.
    async fn relearn(
        &self,
        domain: &Domain,
        page: &RenderedPage,
        record: &StrategyRecord,
    ) -> Result<ExtractionResult> {
        info!(
            domain = %domain,
            failing_method = %record.strategy.method,
            failing_version = record.strategy.version,
            consecutive_failures = record.health.consecutive_failures,
            "strategy degraded past threshold, relearning"
        );
        if let Ok(history) = self.store.history(domain).await {
            debug!(
                domain = %domain,
                prior_versions = history.len(),
                last_relearn = ?record.health.last_relearn_at,
                "domain history before relearn"
            );
        }

        let outcome = self
            .chain
            .run(
                page,
                &self.config.score,
                self.config.accept_threshold,
                self.config.max_records_per_page,
            )
            .await;

        match outcome.winner {
            Some(attempt) => {
                let strategy = self
                    .store
                    .put(domain, attempt.draft, METHOD_SET_VERSION)
                    .await?;
                self.store.record_outcome(domain, true).await?;
                info!(
                    domain = %domain,
                    method = %strategy.method,
                    version = strategy.version,
                    "relearned strategy"
                );
                Ok(attempt.result)
            }
            None => {
                warn!(
                    domain = %domain,
                    kept_version = record.strategy.version,
                    "relearning failed, keeping degraded strategy"
                );
                Ok(best_effort(outcome.best))
            }
        }
    }

    /// Apply the stored strategy directly, skipping the chain.
    async fn apply_stored(
        &self,
        domain: &Domain,
        page: &RenderedPage,
        record: &StrategyRecord,
    ) -> Result<ExtractionResult> {
        let strategy = &record.strategy;
        if record.cache.is_expired(self.config.strategy_ttl) {
            debug!(domain = %domain, "cache TTL expired, revalidating stored strategy");
        }

        let Some(learner) = self.chain.learner_for(strategy.method) else {
            warn!(
                domain = %domain,
                method = %strategy.method,
                "stored method absent from chain, learning afresh"
            );
            return self.learn(domain, page).await;
        };

        match learner.apply(&strategy.rules, page).await {
            Ok(mut records) => {
                records.truncate(self.config.max_records_per_page);
                let confidence = score(&records, &self.config.score);

                if confidence >= self.config.accept_threshold {
                    self.store.record_outcome(domain, true).await?;
                    debug!(domain = %domain, confidence, "cached strategy accepted");
                    return Ok(ExtractionResult::new(records, confidence, strategy.method));
                }

                let health = self.store.record_outcome(domain, false).await?;
                warn!(
                    domain = %domain,
                    confidence,
                    consecutive_failures = health.consecutive_failures,
                    "cached strategy below threshold"
                );
                Ok(ExtractionResult::new(records, confidence, strategy.method)
                    .tagged_low_confidence())
            }
            Err(err) => {
                let health = self.store.record_outcome(domain, false).await?;
                warn!(
                    domain = %domain,
                    error = %err,
                    consecutive_failures = health.consecutive_failures,
                    "cached strategy failed to execute"
                );
                Ok(ExtractionResult::empty(strategy.method))
            }
        }
    }
}

fn best_effort(best: Option<ChainAttempt>) -> ExtractionResult {
    best.map(|attempt| attempt.result.tagged_low_confidence())
        .unwrap_or_else(|| ExtractionResult::empty(LearnerMethod::Pattern))
}
