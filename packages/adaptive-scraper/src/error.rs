//! Typed errors for the strategy engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

use crate::types::strategy::LearnerMethod;

/// Errors surfaced by the engine's top-level operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Page fetcher collaborator failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Strategy store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The per-request deadline elapsed
    #[error("extraction timed out for domain: {domain}")]
    Timeout { domain: String },

    /// Input could not be normalized to a domain
    #[error("not a valid domain or URL: {input}")]
    InvalidDomain { input: String },
}

/// Errors from the external page-rendering collaborator.
///
/// The engine does not retry these; bounded retry belongs to the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Render did not complete within the given timeout
    #[error("timeout rendering: {url}")]
    Timeout { url: String },

    /// Site unreachable (DNS, connection refused, ...)
    #[error("unreachable: {url}")]
    Unreachable { url: String },

    /// The renderer itself failed
    #[error("render failed: {0}")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// A single learner could not produce a candidate.
///
/// Recoverable: the resolver escalates to the next learner in the chain.
/// A full-chain miss is not an error at all: it becomes a low-confidence
/// result and nothing is persisted.
#[derive(Debug, Error)]
pub enum LearnerFailed {
    /// No container selector matched at least two repeated blocks
    #[error("no repeating product structure found")]
    NoRepeatingStructure,

    /// No price-like tokens anywhere in the page text
    #[error("no price-like tokens found")]
    NoPriceTokens,

    /// Visual learner needs a screenshot the fetcher did not provide
    #[error("page has no screenshot")]
    ScreenshotMissing,

    /// Vision model collaborator failed
    #[error("vision analysis failed: {0}")]
    Vision(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored rules belong to a different learner
    #[error("rules do not match this learner: expected {expected}")]
    RulesMismatch { expected: LearnerMethod },
}

/// Persistence layer failure.
///
/// Fatal for the current request; the domain's prior state is unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Outcome recorded for a domain with no strategy
    #[error("no strategy recorded for domain: {domain}")]
    UnknownDomain { domain: String },

    /// Backend unavailable or corrupt
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for learner attempts.
pub type LearnerResult<T> = std::result::Result<T, LearnerFailed>;
