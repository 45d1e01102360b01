//! In-memory strategy store for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::{
    domain::Domain,
    strategy::{
        CacheEntry, ScrapingStrategy, StrategyDraft, StrategyHealth, StrategyRecord,
        SCHEMA_VERSION,
    },
};

struct DomainEntry {
    history: Vec<ScrapingStrategy>,
    /// Index into `history`; `None` after `invalidate`
    current: Option<usize>,
    health: StrategyHealth,
    cache: CacheEntry,
}

/// In-memory store of strategies and health metrics.
///
/// Every mutation happens inside a single write-lock section, so a
/// strategy write and its health reset are one atomic unit. Useful for
/// testing and development; production callers implement
/// [`StrategyStore`](crate::traits::store::StrategyStore) over a durable
/// backend.
#[derive(Default)]
pub struct MemoryStrategyStore {
    entries: RwLock<HashMap<Domain, DomainEntry>>,
}

impl MemoryStrategyStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of domains with any recorded history.
    pub fn domain_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

#[async_trait]
impl crate::traits::store::StrategyStore for MemoryStrategyStore {
    async fn get(&self, domain: &Domain) -> StoreResult<Option<StrategyRecord>> {
        let entries = self.entries.read().unwrap();
        let Some(entry) = entries.get(domain) else {
            return Ok(None);
        };
        let Some(current) = entry.current else {
            return Ok(None);
        };
        Ok(Some(StrategyRecord {
            strategy: entry.history[current].clone(),
            health: entry.health.clone(),
            cache: entry.cache.clone(),
        }))
    }

    async fn put(
        &self,
        domain: &Domain,
        draft: StrategyDraft,
        method_set_version: u32,
    ) -> StoreResult<ScrapingStrategy> {
        let mut entries = self.entries.write().unwrap();
        let now = Utc::now();

        let entry = entries.entry(domain.clone()).or_insert_with(|| DomainEntry {
            history: Vec::new(),
            current: None,
            health: StrategyHealth::new(),
            cache: CacheEntry::new(domain, method_set_version),
        });

        let version = entry.history.last().map_or(1, |s| s.version + 1);
        let strategy = ScrapingStrategy {
            id: Uuid::new_v4(),
            domain: domain.clone(),
            method: draft.method,
            rules: draft.rules,
            schema_version: SCHEMA_VERSION,
            version,
            created_at: now,
        };

        entry.history.push(strategy.clone());
        entry.current = Some(entry.history.len() - 1);
        entry.health = if version > 1 {
            StrategyHealth::after_relearn(now)
        } else {
            StrategyHealth::new()
        };
        entry.cache = CacheEntry::new(domain, method_set_version);

        Ok(strategy)
    }

    async fn record_outcome(&self, domain: &Domain, success: bool) -> StoreResult<StrategyHealth> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .get_mut(domain)
            .filter(|entry| entry.current.is_some())
            .ok_or_else(|| StoreError::UnknownDomain {
                domain: domain.to_string(),
            })?;

        entry.health.record(success, Utc::now());
        if success {
            entry.cache.refresh();
        }
        Ok(entry.health.clone())
    }

    async fn invalidate(&self, domain: &Domain) -> StoreResult<()> {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(domain) {
            entry.current = None;
        }
        Ok(())
    }

    async fn history(&self, domain: &Domain) -> StoreResult<Vec<ScrapingStrategy>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .get(domain)
            .map(|entry| entry.history.clone())
            .unwrap_or_default())
    }

    async fn purge(&self, domain: &Domain) -> StoreResult<()> {
        self.entries.write().unwrap().remove(domain);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::store::StrategyStore;
    use crate::types::strategy::{ExtractionRules, LearnerMethod, TextPatternRules};

    fn domain() -> Domain {
        Domain::parse("example-shop.test").unwrap()
    }

    fn draft() -> StrategyDraft {
        StrategyDraft {
            method: LearnerMethod::Semantic,
            rules: ExtractionRules::TextPattern(TextPatternRules {
                block_tag: "div".to_owned(),
                block_class: Some("offer".to_owned()),
                min_blocks: 2,
            }),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStrategyStore::new();
        assert!(store.get(&domain()).await.unwrap().is_none());

        let strategy = store.put(&domain(), draft(), 1).await.unwrap();
        assert_eq!(strategy.version, 1);

        let record = store.get(&domain()).await.unwrap().unwrap();
        assert_eq!(record.strategy.id, strategy.id);
        assert_eq!(record.health, StrategyHealth::new());
        assert!(record.cache.is_current(&domain(), 1));
    }

    #[tokio::test]
    async fn test_put_supersedes_and_resets_health() {
        let store = MemoryStrategyStore::new();
        store.put(&domain(), draft(), 1).await.unwrap();

        store.record_outcome(&domain(), false).await.unwrap();
        store.record_outcome(&domain(), false).await.unwrap();

        let second = store.put(&domain(), draft(), 1).await.unwrap();
        assert_eq!(second.version, 2);

        let record = store.get(&domain()).await.unwrap().unwrap();
        assert_eq!(record.health.consecutive_failures, 0);
        assert_eq!(record.health.failure_count, 0);
        assert!(record.health.last_relearn_at.is_some());

        // Supersede keeps history
        let history = store.history(&domain()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 1);
    }

    #[tokio::test]
    async fn test_record_outcome_counters() {
        let store = MemoryStrategyStore::new();
        store.put(&domain(), draft(), 1).await.unwrap();

        let health = store.record_outcome(&domain(), false).await.unwrap();
        assert_eq!(health.consecutive_failures, 1);
        let health = store.record_outcome(&domain(), false).await.unwrap();
        assert_eq!(health.consecutive_failures, 2);

        let health = store.record_outcome(&domain(), true).await.unwrap();
        assert_eq!(health.consecutive_failures, 0);
        assert_eq!(health.success_count, 1);
        assert_eq!(health.failure_count, 2);
    }

    #[tokio::test]
    async fn test_record_outcome_unknown_domain() {
        let store = MemoryStrategyStore::new();
        let err = store.record_outcome(&domain(), true).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownDomain { .. }));
    }

    #[tokio::test]
    async fn test_success_refreshes_cache_entry() {
        let store = MemoryStrategyStore::new();
        store.put(&domain(), draft(), 1).await.unwrap();

        // Backdate the cache entry, then confirm success refreshes it
        {
            let mut entries = store.entries.write().unwrap();
            let entry = entries.get_mut(&domain()).unwrap();
            entry.cache.refreshed_at = Utc::now() - chrono::Duration::days(40);
        }
        let record = store.get(&domain()).await.unwrap().unwrap();
        assert!(record.cache.is_expired(std::time::Duration::from_secs(30 * 24 * 3600)));

        store.record_outcome(&domain(), true).await.unwrap();
        let record = store.get(&domain()).await.unwrap().unwrap();
        assert!(!record.cache.is_expired(std::time::Duration::from_secs(30 * 24 * 3600)));
    }

    #[tokio::test]
    async fn test_invalidate_keeps_history() {
        let store = MemoryStrategyStore::new();
        store.put(&domain(), draft(), 1).await.unwrap();

        store.invalidate(&domain()).await.unwrap();
        assert!(store.get(&domain()).await.unwrap().is_none());
        assert_eq!(store.history(&domain()).await.unwrap().len(), 1);

        // A new put after invalidation still continues the version line
        let next = store.put(&domain(), draft(), 1).await.unwrap();
        assert_eq!(next.version, 2);
    }

    #[tokio::test]
    async fn test_purge_deletes_everything() {
        let store = MemoryStrategyStore::new();
        store.put(&domain(), draft(), 1).await.unwrap();

        store.purge(&domain()).await.unwrap();
        assert!(store.get(&domain()).await.unwrap().is_none());
        assert!(store.history(&domain()).await.unwrap().is_empty());
        assert_eq!(store.domain_count(), 0);
    }
}
