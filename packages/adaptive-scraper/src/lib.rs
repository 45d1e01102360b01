//! Adaptive Scraping Strategy Engine
//!
//! Learns, stores, selects, validates, and re-learns per-domain
//! extraction strategies for e-commerce pages - with no site-specific
//! logic authored in advance.
//!
//! # Design Philosophy
//!
//! - Cheap before expensive: selector candidates, then text analysis,
//!   then vision, in a fixed fallback chain
//! - Nothing persisted below the acceptance threshold - the cache never
//!   holds garbage
//! - Drift is detected, not configured: consecutive low-confidence
//!   applications trigger relearning automatically
//! - All state lives in the strategy store; concurrency is explicit
//!   per-domain locking, never shared singletons
//!
//! # Usage
//!
//! ```rust,ignore
//! use adaptive_scraper::{Domain, Engine, MemoryStrategyStore};
//!
//! let engine = Engine::new(MemoryStrategyStore::new(), fetcher, vision);
//!
//! // First scrape of a domain learns a strategy; later scrapes reuse it
//! let result = engine.scrape("https://example-shop.test/catalog").await?;
//!
//! // Introspection and administrative tooling
//! let domain = Domain::parse("example-shop.test").unwrap();
//! let strategy = engine.strategy(&domain).await?;
//! engine.invalidate_strategy(&domain).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (StrategyStore, PageFetcher, Learner, VisionModel)
//! - [`types`] - Domains, pages, products, strategies, configuration
//! - [`learners`] - The ordered fallback chain (pattern, semantic, visual)
//! - [`pipeline`] - Scoring, resolution state machine, coordination, engine facade
//! - [`stores`] - Storage implementations (MemoryStrategyStore)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod learners;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{EngineError, FetchError, LearnerFailed, Result, StoreError};
pub use traits::{
    fetcher::PageFetcher,
    learner::{LearnedCandidate, Learner},
    store::StrategyStore,
    vision::{ProductRegion, VisionModel},
};
pub use types::{
    config::{EngineConfig, ScoreConfig},
    domain::Domain,
    page::{PageNode, RenderedPage},
    product::{AttrValue, ExtractionResult, ProductRecord},
    strategy::{
        CacheEntry, ExtractionRules, LearnerMethod, ScrapingStrategy, StrategyDraft,
        StrategyHealth, StrategyRecord,
    },
};

// Re-export the engine and pipeline components
pub use pipeline::{DomainCoordinator, DomainState, Engine, StrategyResolver};

// Re-export the learner chain
pub use learners::{
    LearnerChain, PatternLearner, SemanticLearner, VisualLearner, METHOD_SET_VERSION,
};

// Re-export stores
pub use stores::MemoryStrategyStore;
