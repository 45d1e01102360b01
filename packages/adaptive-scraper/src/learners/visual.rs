//! Visual-fallback learner: holistic screenshot analysis.
//!
//! Last resort in the chain, reserved for pages where neither markup
//! structure nor text tokens expose product blocks. Delegates the
//! expensive analysis to the embedding application's `VisionModel`; the
//! persisted rules are just the prompt, so re-application replays the
//! same analysis against a fresh screenshot.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::{LearnerFailed, LearnerResult};
use crate::learners::enrich::{self, AttributePatterns};
use crate::traits::learner::{LearnedCandidate, Learner};
use crate::traits::vision::{ProductRegion, VisionModel};
use crate::types::{
    page::RenderedPage,
    product::ProductRecord,
    strategy::{ExtractionRules, LearnerMethod, VisionRules},
};

/// Prompt handed to the vision model when learning a page.
pub const DEFAULT_VISION_PROMPT: &str = "Locate every product listing visible in this \
screenshot. For each one, read the product name, the displayed price with its currency, \
and any model number or specification text.";

/// Learner that reads product blocks out of a page screenshot.
pub struct VisualLearner {
    vision: Arc<dyn VisionModel>,
    attrs: AttributePatterns,
}

impl VisualLearner {
    /// Create a visual learner backed by the given vision model.
    pub fn new(vision: Arc<dyn VisionModel>) -> Self {
        Self {
            vision,
            attrs: AttributePatterns::default(),
        }
    }

    async fn analyze(&self, prompt: &str, page: &RenderedPage) -> LearnerResult<Vec<ProductRecord>> {
        let Some(screenshot) = page.screenshot.as_deref() else {
            return Err(LearnerFailed::ScreenshotMissing);
        };

        let regions = self
            .vision
            .locate_products(screenshot, prompt)
            .await
            .map_err(LearnerFailed::Vision)?;
        debug!(count = regions.len(), "vision model located product regions");

        Ok(regions
            .into_iter()
            .filter_map(|region| self.record_from(region))
            .collect())
    }

    fn record_from(&self, region: ProductRegion) -> Option<ProductRecord> {
        let name = region.name.trim().to_owned();
        if name.is_empty() {
            return None;
        }

        let mut record = ProductRecord::new(name);
        if let Some(price_text) = &region.price_text {
            record.price = enrich::parse_price(price_text);
            if let Some(currency) = enrich::detect_currency(price_text) {
                record.currency = currency.to_owned();
            }
        }

        let spec_text = match &region.detail_text {
            Some(detail) => format!("{} {}", record.name, detail),
            None => record.name.clone(),
        };
        record.attributes = self.attrs.extract(&spec_text);
        record.model_id = enrich::stable_model_id(None, &record.name);

        Some(record)
    }
}

#[async_trait]
impl Learner for VisualLearner {
    fn method(&self) -> LearnerMethod {
        LearnerMethod::Visual
    }

    async fn learn(&self, page: &RenderedPage) -> LearnerResult<LearnedCandidate> {
        let records = self.analyze(DEFAULT_VISION_PROMPT, page).await?;
        Ok(LearnedCandidate {
            rules: ExtractionRules::Vision(VisionRules {
                prompt: DEFAULT_VISION_PROMPT.to_owned(),
            }),
            records,
        })
    }

    async fn apply(
        &self,
        rules: &ExtractionRules,
        page: &RenderedPage,
    ) -> LearnerResult<Vec<ProductRecord>> {
        match rules {
            ExtractionRules::Vision(rules) => self.analyze(&rules.prompt, page).await,
            _ => Err(LearnerFailed::RulesMismatch {
                expected: LearnerMethod::Visual,
            }),
        }
    }
}
