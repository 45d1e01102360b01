//! Per-domain coordination: one learning cycle per domain at a time.
//!
//! Holds a lazily created `tokio::Mutex` per domain in a `DashMap`, so a
//! second caller for the same domain waits for the first's outcome and
//! then reuses the freshly persisted strategy instead of running the
//! chain again. Requests for different domains proceed in parallel,
//! bounded by a worker-pool semaphore. Idle lock entries are reclaimed
//! with a strong-count check on release.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::pipeline::resolve::StrategyResolver;
use crate::traits::store::StrategyStore;
use crate::types::{config::EngineConfig, domain::Domain, page::RenderedPage, product::ExtractionResult};

/// Dispatches resolver calls across a bounded worker pool, serialized
/// per domain.
pub struct DomainCoordinator<S: StrategyStore> {
    resolver: StrategyResolver<S>,
    locks: DashMap<Domain, Arc<Mutex<()>>>,
    workers: Semaphore,
    request_timeout: std::time::Duration,
}

impl<S: StrategyStore> DomainCoordinator<S> {
    /// Create a coordinator over a resolver.
    pub fn new(resolver: StrategyResolver<S>, config: &EngineConfig) -> Self {
        Self {
            resolver,
            locks: DashMap::new(),
            workers: Semaphore::new(config.max_workers.max(1)),
            request_timeout: config.request_timeout,
        }
    }

    /// Extract products from a rendered page for a domain.
    ///
    /// Safe for arbitrary concurrent invocation. The whole per-domain
    /// critical section runs under the request deadline; a timeout
    /// releases the lock and leaves the domain exactly as it was, since
    /// nothing is persisted before a learner attempt completes.
    pub async fn extract(
        &self,
        domain: &Domain,
        page: &RenderedPage,
    ) -> Result<ExtractionResult> {
        let _permit = self.workers.acquire().await.unwrap();
        let lock = self.lock_for(domain);

        let outcome = tokio::time::timeout(self.request_timeout, async {
            let _guard = lock.lock().await;
            self.resolver.resolve(domain, page).await
        })
        .await;
        drop(lock);
        self.reclaim(domain);

        match outcome {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(domain = %domain, "extraction request timed out");
                Err(EngineError::Timeout {
                    domain: domain.to_string(),
                })
            }
        }
    }

    /// Lazily create (or reuse) the domain's mutual-exclusion unit.
    fn lock_for(&self, domain: &Domain) -> Arc<Mutex<()>> {
        self.locks
            .entry(domain.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once nothing outside the map references it.
    fn reclaim(&self, domain: &Domain) {
        self.locks
            .remove_if(domain, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of live per-domain locks (idle entries are reclaimed).
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}
