//! Semantic learner: price-token analysis with typographic hints.
//!
//! Second in the chain, for pages whose markup defeats the selector
//! candidates. Scans every text node for price-like tokens, groups the
//! hits by their parent's tag + leading class, and takes the dominant
//! repeating group as the product block. Names are picked by emphasis
//! (headings, bold, font-size hints) rather than fixed selectors.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::error::{LearnerFailed, LearnerResult};
use crate::learners::enrich::{self, AttributePatterns, PRICE_TOKEN_PATTERN};
use crate::traits::learner::{LearnedCandidate, Learner};
use crate::types::{
    page::{PageNode, RenderedPage},
    product::ProductRecord,
    strategy::{ExtractionRules, LearnerMethod, TextPatternRules},
};

/// Learner recovering product blocks from price-token repetition.
pub struct SemanticLearner {
    price_re: Regex,
    attrs: AttributePatterns,
}

impl Default for SemanticLearner {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticLearner {
    /// Create a semantic learner with the default attribute criteria.
    pub fn new() -> Self {
        Self {
            price_re: Regex::new(PRICE_TOKEN_PATTERN).unwrap(),
            attrs: AttributePatterns::default(),
        }
    }

    fn extract(
        &self,
        rules: &TextPatternRules,
        page: &RenderedPage,
    ) -> LearnerResult<Vec<ProductRecord>> {
        let mut blocks: Vec<&PageNode> = Vec::new();
        page.root.visit(&mut |node, _| {
            let class_ok = match &rules.block_class {
                Some(class) => node.classes.first() == Some(class),
                None => true,
            };
            if node.tag == rules.block_tag && class_ok {
                blocks.push(node);
            }
        });

        if blocks.len() < rules.min_blocks {
            return Err(LearnerFailed::NoRepeatingStructure);
        }

        let base = Url::parse(&page.url).ok();
        Ok(blocks
            .into_iter()
            .filter_map(|block| self.extract_block(block, base.as_ref()))
            .collect())
    }

    fn extract_block(&self, block: &PageNode, base: Option<&Url>) -> Option<ProductRecord> {
        let block_text = block.full_text();
        let price_token = self.price_re.find(&block_text)?.as_str();

        let name = self.pick_name(block)?;
        let mut record = ProductRecord::new(name);

        record.price = enrich::parse_price(price_token);
        record.currency = enrich::detect_currency(price_token)
            .unwrap_or("USD")
            .to_owned();

        record.product_url = first_link(block).and_then(|href| {
            if Url::parse(&href).is_ok() {
                Some(href)
            } else {
                base?.join(&href).ok().map(Into::into)
            }
        });

        record.model_id = enrich::stable_model_id(None, &record.name);
        record.attributes = self.attrs.extract(&block_text);

        Some(record)
    }

    /// Most emphasized non-price text in the block; document order breaks
    /// ties so repeated calls are deterministic.
    fn pick_name(&self, block: &PageNode) -> Option<String> {
        let mut best: Option<(f32, String)> = None;
        let mut fallback: Option<String> = None;

        let mut consider = |node: &PageNode| {
            let text = node.text.trim();
            if text.len() < 3 || text.len() > 200 || self.price_re.is_match(text) {
                return;
            }
            if fallback.is_none() {
                fallback = Some(text.to_owned());
            }
            let weight = emphasis_weight(node);
            if weight > 0.0 && best.as_ref().map_or(true, |(w, _)| weight > *w) {
                best = Some((weight, text.to_owned()));
            }
        };

        consider(block);
        for node in block.descendants() {
            consider(node);
        }

        best.map(|(_, name)| name).or(fallback)
    }
}

/// Typographic weight: headings and bold text rank highest, links above
/// plain text, with any renderer font-size hint added on top.
fn emphasis_weight(node: &PageNode) -> f32 {
    let tag_rank = match node.tag.as_str() {
        "h1" => 7.0,
        "h2" => 6.5,
        "h3" => 6.0,
        "h4" => 5.5,
        "h5" => 5.0,
        "h6" => 4.5,
        "strong" | "b" => 4.0,
        "a" => 3.0,
        _ => 0.0,
    };
    tag_rank + node.font_size.unwrap_or(0.0) / 8.0
}

fn first_link(block: &PageNode) -> Option<String> {
    block
        .descendants()
        .into_iter()
        .find(|node| node.tag == "a" && node.attrs.contains_key("href"))
        .and_then(|node| node.attr("href"))
}

#[async_trait]
impl Learner for SemanticLearner {
    fn method(&self) -> LearnerMethod {
        LearnerMethod::Semantic
    }

    async fn learn(&self, page: &RenderedPage) -> LearnerResult<LearnedCandidate> {
        // Collect parents of price-bearing text nodes
        let mut parents: Vec<&PageNode> = Vec::new();
        page.root.visit(&mut |node, parent| {
            if self.price_re.is_match(&node.text) {
                if let Some(parent) = parent {
                    parents.push(parent);
                }
            }
        });

        if parents.is_empty() {
            return Err(LearnerFailed::NoPriceTokens);
        }

        // Group by parent tag + leading class; the dominant repeating
        // group is the product block.
        let mut groups: HashMap<(String, Option<String>), usize> = HashMap::new();
        for parent in parents {
            let key = (parent.tag.clone(), parent.classes.first().cloned());
            *groups.entry(key).or_insert(0) += 1;
        }

        let mut ranked: Vec<_> = groups.into_iter().filter(|(_, count)| *count >= 2).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let Some(((block_tag, block_class), count)) = ranked.into_iter().next() else {
            return Err(LearnerFailed::NoRepeatingStructure);
        };
        debug!(
            tag = %block_tag,
            class = block_class.as_deref().unwrap_or(""),
            count,
            "dominant price-bearing block"
        );

        let rules = TextPatternRules {
            block_tag,
            block_class,
            min_blocks: 2,
        };
        let records = self.extract(&rules, page)?;

        Ok(LearnedCandidate {
            rules: ExtractionRules::TextPattern(rules),
            records,
        })
    }

    async fn apply(
        &self,
        rules: &ExtractionRules,
        page: &RenderedPage,
    ) -> LearnerResult<Vec<ProductRecord>> {
        match rules {
            ExtractionRules::TextPattern(rules) => self.extract(rules, page),
            _ => Err(LearnerFailed::RulesMismatch {
                expected: LearnerMethod::Semantic,
            }),
        }
    }
}
