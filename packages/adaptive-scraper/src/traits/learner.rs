//! The learner capability - one fallback extraction method.

use async_trait::async_trait;

use crate::error::LearnerResult;
use crate::types::{
    page::RenderedPage,
    product::ProductRecord,
    strategy::{ExtractionRules, LearnerMethod},
};

/// A candidate produced by a successful learn attempt: the reusable
/// rules plus the records they extracted from the page at hand.
#[derive(Debug, Clone)]
pub struct LearnedCandidate {
    pub rules: ExtractionRules,
    pub records: Vec<ProductRecord>,
}

/// One extraction method in the ordered fallback chain.
///
/// There is no per-domain dispatch anywhere: every learner is
/// domain-agnostic and the chain is a fixed, cheapest-first list of
/// these implementations.
#[async_trait]
pub trait Learner: Send + Sync {
    /// Which method this learner implements.
    fn method(&self) -> LearnerMethod;

    /// Attempt to discover rules for this page and extract with them.
    ///
    /// An `Err` means this learner cannot handle the page; the resolver
    /// escalates to the next one.
    async fn learn(&self, page: &RenderedPage) -> LearnerResult<LearnedCandidate>;

    /// Re-apply previously persisted rules to a (possibly changed) page.
    async fn apply(
        &self,
        rules: &ExtractionRules,
        page: &RenderedPage,
    ) -> LearnerResult<Vec<ProductRecord>>;
}
