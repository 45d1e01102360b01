//! Pattern-based learner: common e-commerce markup conventions.
//!
//! Cheapest method in the chain. Scans an ordered list of container
//! candidates for a repeated structural pattern (at least two matches),
//! then discovers per-field sub-selectors against the first container.
//! Works well on templated sites; the rules it persists are plain
//! selector strings that re-apply in microseconds.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{LearnerFailed, LearnerResult};
use crate::learners::enrich::{self, AttributePatterns};
use crate::learners::selectors::Selector;
use crate::traits::learner::{LearnedCandidate, Learner};
use crate::types::{
    page::{PageNode, RenderedPage},
    product::ProductRecord,
    strategy::{ExtractionRules, LearnerMethod, SelectorRules},
};

/// Container candidates, tried in order.
const CONTAINER_CANDIDATES: &[&str] = &[
    "[data-product-id]",
    "[data-item-id]",
    ".product-card",
    ".product-item",
    ".product-tile",
    ".product-listing",
    ".product-box",
    ".search-result",
    ".s-result-item",
    ".product",
    "li[class*='product']",
    "div[class*='product']",
    "article[class*='product']",
    "div[class*='Product']",
    "div[class*='item']",
    "div[class*='Item']",
];

const NAME_CANDIDATES: &[&str] = &[
    "h2 a",
    "h3 a",
    "h2",
    "h3",
    "[class*='title'] a",
    "[class*='name'] a",
    "[class*='Title'] a",
    "[class*='Name'] a",
    "[class*='title']",
    "[class*='name']",
    "[class*='Title']",
    "[class*='Name']",
    "a[class*='product']",
    "a[class*='Product']",
    "a[class*='Model']",
];

const PRICE_CANDIDATES: &[&str] = &[
    "[class*='price']",
    "[class*='Price']",
    "[data-price]",
    "[data-min-price]",
    "span[class*='amount']",
    "[class*='cost']",
    "[class*='Cost']",
];

const IMAGE_CANDIDATES: &[&str] = &[
    "img[src*='product']",
    "img[data-src]",
    "img[class*='product']",
    "img[class*='Product']",
    "img[loading]",
    "img",
];

const URL_CANDIDATES: &[&str] = &[
    "a[href*='/product']",
    "a[href*='/dp/']",
    "a[href*='/item']",
    "a[href*='/p/']",
    "a[href*='/model']",
    "a[href*='pid=']",
    "a[href]",
];

const BRAND_CANDIDATES: &[&str] = &[
    "[itemprop*='brand']",
    "[class*='brand']",
    "[class*='Brand']",
    "[data-brand]",
];

const MODEL_CANDIDATES: &[&str] = &[
    "[itemprop*='mpn']",
    "[class*='model']",
    "[class*='Model']",
    "[class*='sku']",
    "[data-sku]",
];

/// Learner matching repeated structural markup with selector candidates.
#[derive(Default)]
pub struct PatternLearner {
    attrs: AttributePatterns,
}

impl PatternLearner {
    /// Create a pattern learner with the default attribute criteria.
    pub fn new() -> Self {
        Self::default()
    }

    fn extract(&self, rules: &SelectorRules, page: &RenderedPage) -> Vec<ProductRecord> {
        let Some(container_sel) = Selector::parse(&rules.container) else {
            return Vec::new();
        };
        let containers = container_sel.select_all(&page.root);
        if containers.is_empty() {
            debug!(container = %rules.container, "no containers matched stored selector");
            return Vec::new();
        }

        let base = Url::parse(&page.url).ok();
        containers
            .into_iter()
            .filter_map(|container| self.extract_one(rules, container, base.as_ref()))
            .collect()
    }

    fn extract_one(
        &self,
        rules: &SelectorRules,
        container: &PageNode,
        base: Option<&Url>,
    ) -> Option<ProductRecord> {
        let name = select_text(container, &rules.name)?;
        if name.is_empty() {
            return None;
        }

        let mut record = ProductRecord::new(name);

        if let Some(price_sel) = &rules.price {
            if let Some(price_text) = select_text(container, price_sel) {
                record.price = enrich::parse_price(&price_text);
                record.currency = enrich::detect_currency(&price_text)
                    .map(str::to_owned)
                    .or_else(|| rules.currency_hint.clone())
                    .unwrap_or_else(|| "USD".to_owned());
            }
        } else if let Some(hint) = &rules.currency_hint {
            record.currency = hint.clone();
        }

        if let Some(url_sel) = &rules.url {
            record.product_url = select_node(container, url_sel)
                .and_then(|node| node.attr("href"))
                .and_then(|href| resolve_url(base, &href));
        }

        if let Some(image_sel) = &rules.image {
            record.image_url = select_node(container, image_sel)
                .and_then(|node| node.attr("src").or_else(|| node.attr("data-src")))
                .and_then(|src| resolve_url(base, &src));
        }

        if let Some(brand_sel) = &rules.brand {
            record.brand = select_text(container, brand_sel).filter(|s| !s.is_empty());
        }

        if let Some(model_sel) = &rules.model {
            record.model_id = select_text(container, model_sel).filter(|s| !s.is_empty());
        }
        if record.model_id.is_none() {
            record.model_id = enrich::stable_model_id(record.brand.as_deref(), &record.name);
        }

        record.attributes = self.attrs.extract(&container.full_text());

        Some(record)
    }
}

#[async_trait]
impl Learner for PatternLearner {
    fn method(&self) -> LearnerMethod {
        LearnerMethod::Pattern
    }

    async fn learn(&self, page: &RenderedPage) -> LearnerResult<LearnedCandidate> {
        for candidate in CONTAINER_CANDIDATES {
            let Some(sel) = Selector::parse(candidate) else {
                continue;
            };
            let containers = sel.select_all(&page.root);
            if containers.len() < 2 {
                continue;
            }
            debug!(
                count = containers.len(),
                selector = candidate,
                "found repeated containers"
            );

            // Discover sub-selectors against the first container
            let first = containers[0];
            let Some(name) = find_selector(first, NAME_CANDIDATES) else {
                continue;
            };
            let price = find_selector(first, PRICE_CANDIDATES);
            let image = find_selector(first, IMAGE_CANDIDATES);
            let url = find_selector(first, URL_CANDIDATES);
            let brand = find_selector(first, BRAND_CANDIDATES);
            let model = find_selector(first, MODEL_CANDIDATES);

            let currency_hint = price
                .as_deref()
                .and_then(|sel| select_text(first, sel))
                .and_then(|text| enrich::detect_currency(&text))
                .map(str::to_owned);

            let rules = SelectorRules {
                container: (*candidate).to_owned(),
                name,
                price,
                image,
                url,
                brand,
                model,
                currency_hint,
            };
            let records = self.extract(&rules, page);

            return Ok(LearnedCandidate {
                rules: ExtractionRules::Selector(rules),
                records,
            });
        }

        Err(LearnerFailed::NoRepeatingStructure)
    }

    async fn apply(
        &self,
        rules: &ExtractionRules,
        page: &RenderedPage,
    ) -> LearnerResult<Vec<ProductRecord>> {
        match rules {
            ExtractionRules::Selector(rules) => Ok(self.extract(rules, page)),
            _ => Err(LearnerFailed::RulesMismatch {
                expected: LearnerMethod::Pattern,
            }),
        }
    }
}

/// First candidate selector that matches inside `container`.
fn find_selector(container: &PageNode, candidates: &[&str]) -> Option<String> {
    for candidate in candidates {
        if let Some(sel) = Selector::parse(candidate) {
            if sel.select_first(container).is_some() {
                return Some((*candidate).to_owned());
            }
        }
    }
    None
}

fn select_node<'a>(container: &'a PageNode, selector: &str) -> Option<&'a PageNode> {
    Selector::parse(selector)?.select_first(container)
}

fn select_text(container: &PageNode, selector: &str) -> Option<String> {
    select_node(container, selector).map(|node| node.full_text().trim().to_owned())
}

fn resolve_url(base: Option<&Url>, href: &str) -> Option<String> {
    if Url::parse(href).is_ok() {
        return Some(href.to_owned());
    }
    base?.join(href).ok().map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, price: &str, href: &str) -> PageNode {
        PageNode::new("div").with_class("product-card").with_children([
            PageNode::new("h3").with_child(
                PageNode::new("a").with_attr("href", href).with_text(name),
            ),
            PageNode::new("span").with_class("price").with_text(price),
            PageNode::new("img").with_attr("src", "/img/p.jpg").with_attr("loading", "lazy"),
        ])
    }

    fn listing_page() -> RenderedPage {
        let root = PageNode::new("body").with_children([
            card("Quiet Fridge 300L", "$499.00", "/p/fridge"),
            card("Silent Washer 8kg", "$899.50", "/p/washer"),
            card("Compact Freezer", "$329.99", "/p/freezer"),
        ]);
        RenderedPage::new("https://example-shop.test/catalog", root)
    }

    #[tokio::test]
    async fn test_learn_discovers_selector_rules() {
        let learner = PatternLearner::new();
        let candidate = learner.learn(&listing_page()).await.unwrap();

        let ExtractionRules::Selector(rules) = &candidate.rules else {
            panic!("expected selector rules");
        };
        assert_eq!(rules.container, ".product-card");
        assert_eq!(rules.name, "h3 a");
        assert_eq!(rules.price.as_deref(), Some("[class*='price']"));
        assert_eq!(rules.currency_hint.as_deref(), Some("USD"));

        assert_eq!(candidate.records.len(), 3);
        assert_eq!(candidate.records[0].name, "Quiet Fridge 300L");
        assert_eq!(candidate.records[0].price, Some(499.0));
        assert_eq!(
            candidate.records[0].product_url.as_deref(),
            Some("https://example-shop.test/p/fridge")
        );
        assert!(candidate.records[0].model_id.is_some());
    }

    #[tokio::test]
    async fn test_learn_needs_two_containers() {
        let root = PageNode::new("body").with_child(card("Lonely Product", "$1.00", "/p/1"));
        let page = RenderedPage::new("https://example-shop.test", root);

        let learner = PatternLearner::new();
        let err = learner.learn(&page).await.unwrap_err();
        assert!(matches!(err, LearnerFailed::NoRepeatingStructure));
    }

    #[tokio::test]
    async fn test_apply_with_stale_rules_yields_nothing() {
        let rules = ExtractionRules::Selector(SelectorRules {
            container: ".gone-from-markup".to_owned(),
            name: "h3 a".to_owned(),
            price: None,
            image: None,
            url: None,
            brand: None,
            model: None,
            currency_hint: None,
        });

        let learner = PatternLearner::new();
        let records = learner.apply(&rules, &listing_page()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_apply_rejects_foreign_rules() {
        use crate::types::strategy::TextPatternRules;

        let rules = ExtractionRules::TextPattern(TextPatternRules {
            block_tag: "div".to_owned(),
            block_class: None,
            min_blocks: 2,
        });

        let learner = PatternLearner::new();
        let err = learner.apply(&rules, &listing_page()).await.unwrap_err();
        assert!(matches!(
            err,
            LearnerFailed::RulesMismatch {
                expected: LearnerMethod::Pattern
            }
        ));
    }

    #[tokio::test]
    async fn test_attributes_extracted_from_container_text() {
        let root = PageNode::new("body").with_children([
            card("Washer 1400 RPM 8kg", "$899", "/p/w1"),
            card("Washer 1200 RPM 7kg", "$799", "/p/w2"),
        ]);
        let page = RenderedPage::new("https://example-shop.test", root);

        let learner = PatternLearner::new();
        let candidate = learner.learn(&page).await.unwrap();
        let attrs = &candidate.records[0].attributes;
        assert_eq!(
            attrs.get("spin_speed"),
            Some(&crate::types::product::AttrValue::Number(1400.0))
        );
    }
}
