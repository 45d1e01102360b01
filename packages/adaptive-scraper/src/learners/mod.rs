//! The ordered learner chain: pattern, semantic, visual fallback.

pub mod enrich;
pub mod pattern;
pub(crate) mod selectors;
pub mod semantic;
pub mod visual;

use std::sync::Arc;
use tracing::{debug, info};

use crate::pipeline::score::score;
use crate::traits::learner::Learner;
use crate::traits::vision::VisionModel;
use crate::types::{
    config::ScoreConfig,
    page::RenderedPage,
    product::ExtractionResult,
    strategy::{LearnerMethod, StrategyDraft},
};

pub use pattern::PatternLearner;
pub use semantic::SemanticLearner;
pub use visual::{VisualLearner, DEFAULT_VISION_PROMPT};

/// Version of the learner set. Bumping it changes every domain's cache
/// key at once, forcing relearning without per-domain migration.
pub const METHOD_SET_VERSION: u32 = 1;

/// One scored attempt: the draft strategy plus the result it produced.
#[derive(Debug, Clone)]
pub struct ChainAttempt {
    pub draft: StrategyDraft,
    pub result: ExtractionResult,
}

/// Outcome of running the chain over a page.
///
/// `best` is the highest-scoring attempt when nothing cleared the
/// threshold; it is returned to the caller but never persisted.
pub struct ChainOutcome {
    pub winner: Option<ChainAttempt>,
    pub best: Option<ChainAttempt>,
}

/// Fixed, cheapest-first list of learners.
///
/// Dispatch is polymorphic over the `Learner` capability; there is no
/// table keyed by domain anywhere.
pub struct LearnerChain {
    learners: Vec<Arc<dyn Learner>>,
}

impl LearnerChain {
    /// The standard chain: pattern, semantic, then visual fallback.
    pub fn standard(vision: Arc<dyn VisionModel>) -> Self {
        Self::new(vec![
            Arc::new(PatternLearner::new()),
            Arc::new(SemanticLearner::new()),
            Arc::new(VisualLearner::new(vision)),
        ])
    }

    /// A chain with explicit learners, mostly for tests.
    pub fn new(learners: Vec<Arc<dyn Learner>>) -> Self {
        Self { learners }
    }

    /// The learner implementing a given method, if present.
    pub fn learner_for(&self, method: LearnerMethod) -> Option<&dyn Learner> {
        self.learners
            .iter()
            .find(|learner| learner.method() == method)
            .map(|learner| learner.as_ref())
    }

    /// Try learners in order until one clears `accept_threshold`.
    ///
    /// Escalation rule: learner i+1 runs only when learner i failed
    /// outright or scored below the threshold. Rejected candidates are
    /// discarded entirely.
    pub async fn run(
        &self,
        page: &RenderedPage,
        score_config: &ScoreConfig,
        accept_threshold: f64,
        max_records: usize,
    ) -> ChainOutcome {
        let mut best: Option<ChainAttempt> = None;

        for learner in &self.learners {
            let method = learner.method();
            match learner.learn(page).await {
                Ok(mut candidate) => {
                    candidate.records.truncate(max_records);
                    let confidence = score(&candidate.records, score_config);
                    let attempt = ChainAttempt {
                        draft: StrategyDraft {
                            method,
                            rules: candidate.rules,
                        },
                        result: ExtractionResult::new(candidate.records, confidence, method),
                    };

                    if confidence >= accept_threshold {
                        info!(method = %method, confidence, "learner cleared acceptance threshold");
                        return ChainOutcome {
                            winner: Some(attempt),
                            best: None,
                        };
                    }

                    debug!(method = %method, confidence, "below acceptance threshold, escalating");
                    if best
                        .as_ref()
                        .map_or(true, |b| attempt.result.confidence > b.result.confidence)
                    {
                        best = Some(attempt);
                    }
                }
                Err(err) => {
                    debug!(method = %method, error = %err, "learner failed, escalating");
                }
            }
        }

        ChainOutcome { winner: None, best }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, StubLearner};
    use crate::types::product::ProductRecord;

    fn good_records() -> Vec<ProductRecord> {
        (0..4)
            .map(|i| ProductRecord::new(format!("Product {i}")).with_price(100.0 + i as f64))
            .collect()
    }

    #[tokio::test]
    async fn test_first_clearing_learner_wins() {
        let pattern = Arc::new(
            StubLearner::new(LearnerMethod::Pattern).with_learned_records(good_records()),
        );
        let semantic = Arc::new(
            StubLearner::new(LearnerMethod::Semantic).with_learned_records(good_records()),
        );
        let chain = LearnerChain::new(vec![pattern.clone(), semantic.clone()]);

        let outcome = chain
            .run(&fixtures::blank_page(), &ScoreConfig::default(), 0.6, 50)
            .await;

        let winner = outcome.winner.unwrap();
        assert_eq!(winner.draft.method, LearnerMethod::Pattern);
        assert_eq!(pattern.learn_calls(), 1);
        assert_eq!(semantic.learn_calls(), 0);
    }

    #[tokio::test]
    async fn test_escalates_past_low_scores() {
        // Pattern yields one incomplete record (low score), semantic is good
        let weak = vec![ProductRecord::new("Something")];
        let pattern =
            Arc::new(StubLearner::new(LearnerMethod::Pattern).with_learned_records(weak));
        let semantic = Arc::new(
            StubLearner::new(LearnerMethod::Semantic).with_learned_records(good_records()),
        );
        let chain = LearnerChain::new(vec![pattern, semantic]);

        let outcome = chain
            .run(&fixtures::blank_page(), &ScoreConfig::default(), 0.6, 50)
            .await;

        assert_eq!(outcome.winner.unwrap().draft.method, LearnerMethod::Semantic);
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_best_effort() {
        let weak = vec![ProductRecord::new("Nameless price")];
        let pattern =
            Arc::new(StubLearner::new(LearnerMethod::Pattern).with_learned_records(weak));
        let semantic = Arc::new(StubLearner::new(LearnerMethod::Semantic).failing());
        let chain = LearnerChain::new(vec![pattern, semantic]);

        let outcome = chain
            .run(&fixtures::blank_page(), &ScoreConfig::default(), 0.6, 50)
            .await;

        assert!(outcome.winner.is_none());
        let best = outcome.best.unwrap();
        assert_eq!(best.result.method, LearnerMethod::Pattern);
        assert!(best.result.confidence < 0.6);
    }

    #[tokio::test]
    async fn test_record_cap_applies_before_scoring() {
        let many: Vec<ProductRecord> = (0..100)
            .map(|i| ProductRecord::new(format!("P{i}")).with_price(10.0))
            .collect();
        let pattern =
            Arc::new(StubLearner::new(LearnerMethod::Pattern).with_learned_records(many));
        let chain = LearnerChain::new(vec![pattern]);

        let outcome = chain
            .run(&fixtures::blank_page(), &ScoreConfig::default(), 0.6, 50)
            .await;

        assert_eq!(outcome.winner.unwrap().result.records.len(), 50);
    }
}
