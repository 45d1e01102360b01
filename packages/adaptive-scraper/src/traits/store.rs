//! Storage trait for per-domain strategies and health metrics.
//!
//! Strategies are append-only: `put` creates a new version and moves the
//! "current" pointer; superseded versions stay readable via `history`
//! until an administrative `purge`. A strategy write and its health reset
//! are one atomic unit - no method may partially apply.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    domain::Domain,
    strategy::{ScrapingStrategy, StrategyDraft, StrategyHealth, StrategyRecord},
};

/// Durable keyed storage of one active strategy per domain.
///
/// Implementations must make each method atomic for a given domain;
/// per-domain serialization of callers is the coordinator's job and is
/// not re-implemented here.
#[async_trait]
pub trait StrategyStore: Send + Sync {
    /// Current strategy, health, and cache entry for a domain.
    ///
    /// Returns `None` for unseen or invalidated domains.
    async fn get(&self, domain: &Domain) -> StoreResult<Option<StrategyRecord>>;

    /// Persist a newly learned strategy.
    ///
    /// Assigns the next version number, appends to the domain's history,
    /// resets health (stamping `last_relearn_at` when this supersedes an
    /// earlier version), and writes a fresh cache entry - atomically.
    async fn put(
        &self,
        domain: &Domain,
        draft: StrategyDraft,
        method_set_version: u32,
    ) -> StoreResult<ScrapingStrategy>;

    /// Record one application outcome against the current strategy.
    ///
    /// A success resets `consecutive_failures` and refreshes the cache
    /// entry's TTL stamp. Returns the updated health.
    async fn record_outcome(&self, domain: &Domain, success: bool) -> StoreResult<StrategyHealth>;

    /// Drop the "current" pointer so the next resolve treats the domain
    /// as unseen. History is kept.
    async fn invalidate(&self, domain: &Domain) -> StoreResult<()>;

    /// All persisted versions for a domain, oldest first.
    async fn history(&self, domain: &Domain) -> StoreResult<Vec<ScrapingStrategy>>;

    /// Hard-delete everything recorded for a domain. The only delete path.
    async fn purge(&self, domain: &Domain) -> StoreResult<()>;
}
