//! Extraction pipeline - resolution, coordination, and scoring.
//!
//! The pipeline owns the per-domain lifecycle:
//! - Confidence scoring (pure, deterministic)
//! - Strategy resolution with the self-healing state machine
//! - Per-domain coordination over a bounded worker pool
//! - The engine facade callers embed

pub mod coordinate;
pub mod engine;
pub mod resolve;
pub mod score;

pub use coordinate::DomainCoordinator;
pub use engine::Engine;
pub use resolve::{DomainState, StrategyResolver};
pub use score::score;
