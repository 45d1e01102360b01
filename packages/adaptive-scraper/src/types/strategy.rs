//! Persisted strategies, their health metrics, and cache bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::types::domain::Domain;

/// Version of the persisted strategy record layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Identifier of a learner in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerMethod {
    /// Structural selector candidates (cheapest)
    Pattern,
    /// Text-token analysis with typographic hints
    Semantic,
    /// Screenshot analysis via a vision model (most expensive)
    Visual,
}

impl fmt::Display for LearnerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pattern => "pattern",
            Self::Semantic => "semantic",
            Self::Visual => "visual",
        };
        f.write_str(name)
    }
}

/// Selector payload for the pattern learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRules {
    /// Selector matching the repeated product containers
    pub container: String,

    /// Name selector, relative to a container (required)
    pub name: String,

    /// Price selector, when one was discovered
    pub price: Option<String>,

    /// Image selector
    pub image: Option<String>,

    /// Product-link selector
    pub url: Option<String>,

    /// Brand selector
    pub brand: Option<String>,

    /// Model / MPN selector
    pub model: Option<String>,

    /// Currency detected during discovery ("USD", "EUR", ...)
    pub currency_hint: Option<String>,
}

/// Text-pattern payload for the semantic learner.
///
/// Captures the dominant repeating block that carried price tokens:
/// its tag plus (optionally) its leading class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPatternRules {
    /// Tag of the repeating product block
    pub block_tag: String,

    /// Leading class of the block, when it had one
    pub block_class: Option<String>,

    /// Minimum number of blocks for the rules to be considered applicable
    pub min_blocks: usize,
}

/// Vision payload for the visual learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionRules {
    /// Prompt template handed to the vision model
    pub prompt: String,
}

/// Method-specific extraction payload.
///
/// Opaque to the store and the resolver; only the learner that owns the
/// method interprets its variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionRules {
    Selector(SelectorRules),
    TextPattern(TextPatternRules),
    Vision(VisionRules),
}

/// An unpersisted strategy produced by a winning learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDraft {
    pub method: LearnerMethod,
    pub rules: ExtractionRules,
}

/// A persisted, versioned extraction strategy. Immutable once created;
/// relearning appends a new version instead of mutating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapingStrategy {
    /// Unique id of this strategy version
    pub id: Uuid,

    /// Domain the strategy was learned for
    pub domain: Domain,

    /// Learner that produced it
    pub method: LearnerMethod,

    /// Method-specific payload
    pub rules: ExtractionRules,

    /// Record layout version
    pub schema_version: u32,

    /// Monotonic per-domain version, starting at 1
    pub version: u32,

    /// When this version was learned
    pub created_at: DateTime<Utc>,
}

impl ScrapingStrategy {
    /// Serialize for transport or non-native storage backends.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize a previously serialized strategy.
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

/// Mutable health metrics, one per domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyHealth {
    /// Total accepted applications
    pub success_count: u64,

    /// Total rejected or failed applications
    pub failure_count: u64,

    /// Failures since the last success; resets to 0 on any success
    pub consecutive_failures: u32,

    /// Timestamp of the last accepted application
    pub last_success_at: Option<DateTime<Utc>>,

    /// Timestamp of the last relearn that replaced the strategy
    pub last_relearn_at: Option<DateTime<Utc>>,
}

impl StrategyHealth {
    /// Fresh health, as written alongside a newly learned strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh health stamped with a relearn time.
    pub fn after_relearn(at: DateTime<Utc>) -> Self {
        Self {
            last_relearn_at: Some(at),
            ..Self::default()
        }
    }

    /// Record one application outcome.
    pub fn record(&mut self, success: bool, at: DateTime<Utc>) {
        if success {
            self.success_count += 1;
            self.consecutive_failures = 0;
            self.last_success_at = Some(at);
        } else {
            self.failure_count += 1;
            self.consecutive_failures += 1;
        }
    }
}

/// Cache bookkeeping for a domain's current strategy.
///
/// The key is a pure function of `(domain, method-set version)`, so a
/// learner-chain revision invalidates every domain at once without
/// per-domain migration. Expiry forces revalidation, not relearning: a
/// still-healthy strategy gets its TTL refreshed after a successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// `sha256(domain ":" method_set_version)`
    pub key: String,

    /// Last time the entry was written or successfully revalidated
    pub refreshed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry for a domain under the given method-set version.
    pub fn new(domain: &Domain, method_set_version: u32) -> Self {
        Self {
            key: Self::key_for(domain, method_set_version),
            refreshed_at: Utc::now(),
        }
    }

    /// Compute the cache key for a domain and method-set version.
    pub fn key_for(domain: &Domain, method_set_version: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(method_set_version.to_le_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether the key still matches the current method-set version.
    pub fn is_current(&self, domain: &Domain, method_set_version: u32) -> bool {
        self.key == Self::key_for(domain, method_set_version)
    }

    /// Whether the TTL has elapsed since the last refresh.
    pub fn is_expired(&self, ttl: std::time::Duration) -> bool {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Utc::now() - self.refreshed_at > ttl
    }

    /// Stamp a successful revalidation.
    pub fn refresh(&mut self) {
        self.refreshed_at = Utc::now();
    }
}

/// Everything the store knows about a domain's current strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub strategy: ScrapingStrategy,
    pub health: StrategyHealth,
    pub cache: CacheEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn domain() -> Domain {
        Domain::parse("example-shop.test").unwrap()
    }

    #[test]
    fn test_health_resets_on_success() {
        let mut health = StrategyHealth::new();
        let now = Utc::now();

        health.record(false, now);
        health.record(false, now);
        assert_eq!(health.consecutive_failures, 2);

        health.record(true, now);
        assert_eq!(health.consecutive_failures, 0);
        assert_eq!(health.success_count, 1);
        assert_eq!(health.failure_count, 2);
        assert_eq!(health.last_success_at, Some(now));
    }

    #[test]
    fn test_cache_key_changes_with_method_set_version() {
        let key_v1 = CacheEntry::key_for(&domain(), 1);
        let key_v2 = CacheEntry::key_for(&domain(), 2);
        assert_ne!(key_v1, key_v2);

        let entry = CacheEntry::new(&domain(), 1);
        assert!(entry.is_current(&domain(), 1));
        assert!(!entry.is_current(&domain(), 2));
    }

    #[test]
    fn test_cache_expiry_and_refresh() {
        let mut entry = CacheEntry::new(&domain(), 1);
        entry.refreshed_at = Utc::now() - chrono::Duration::days(31);
        assert!(entry.is_expired(std::time::Duration::from_secs(30 * 24 * 3600)));

        entry.refresh();
        assert!(!entry.is_expired(std::time::Duration::from_secs(30 * 24 * 3600)));
    }

    #[test]
    fn test_strategy_json_round_trip() {
        let strategy = ScrapingStrategy {
            id: uuid::Uuid::new_v4(),
            domain: domain(),
            method: LearnerMethod::Semantic,
            rules: ExtractionRules::TextPattern(TextPatternRules {
                block_tag: "div".to_owned(),
                block_class: Some("offer".to_owned()),
                min_blocks: 2,
            }),
            schema_version: SCHEMA_VERSION,
            version: 3,
            created_at: Utc::now(),
        };

        let json = strategy.to_json().unwrap();
        let back = ScrapingStrategy::from_json(&json).unwrap();
        assert_eq!(back, strategy);
        assert!(json.contains("\"method\":\"semantic\""));
    }

    #[test]
    fn test_rules_round_trip_tagged() {
        let rules = ExtractionRules::Selector(SelectorRules {
            container: ".product-card".to_owned(),
            name: "h3 a".to_owned(),
            price: Some("[class*='price']".to_owned()),
            image: None,
            url: Some("a[href]".to_owned()),
            brand: None,
            model: None,
            currency_hint: Some("USD".to_owned()),
        });

        let json = serde_json::to_string(&rules).unwrap();
        assert!(json.contains("\"kind\":\"selector\""));
        let back: ExtractionRules = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules);
    }

    proptest! {
        /// For any interleaving of outcomes, `consecutive_failures` equals
        /// the length of the trailing failure run, and the totals add up.
        #[test]
        fn prop_health_counters_match_outcome_sequence(outcomes in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut health = StrategyHealth::new();
            let now = Utc::now();
            for &success in &outcomes {
                let before = health.consecutive_failures;
                health.record(success, now);
                if success {
                    prop_assert_eq!(health.consecutive_failures, 0);
                } else {
                    prop_assert_eq!(health.consecutive_failures, before + 1);
                }
            }

            let successes = outcomes.iter().filter(|s| **s).count() as u64;
            let failures = outcomes.len() as u64 - successes;
            prop_assert_eq!(health.success_count, successes);
            prop_assert_eq!(health.failure_count, failures);

            let trailing_failures = outcomes.iter().rev().take_while(|s| !**s).count() as u32;
            prop_assert_eq!(health.consecutive_failures, trailing_failures);
        }
    }
}
