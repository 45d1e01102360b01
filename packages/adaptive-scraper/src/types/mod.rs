//! Core data types: domains, pages, products, strategies, configuration.

pub mod config;
pub mod domain;
pub mod page;
pub mod product;
pub mod strategy;

pub use config::{EngineConfig, ScoreConfig};
pub use domain::Domain;
pub use page::{PageNode, RenderedPage};
pub use product::{AttrValue, ExtractionResult, ProductRecord};
pub use strategy::{
    CacheEntry, ExtractionRules, LearnerMethod, ScrapingStrategy, SelectorRules, StrategyDraft,
    StrategyHealth, StrategyRecord, TextPatternRules, VisionRules, SCHEMA_VERSION,
};
