//! Testing utilities including mock implementations.
//!
//! Useful for testing applications that embed the engine without a real
//! browser or vision provider. All mocks are deterministic and track
//! their calls for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::error::{FetchError, LearnerFailed, LearnerResult};
use crate::traits::{
    fetcher::PageFetcher,
    learner::{LearnedCandidate, Learner},
    vision::{ProductRegion, VisionModel},
};
use crate::types::{
    page::RenderedPage,
    product::ProductRecord,
    strategy::{
        ExtractionRules, LearnerMethod, SelectorRules, TextPatternRules, VisionRules,
    },
};

/// A page fetcher serving canned pages, with failure injection.
#[derive(Default)]
pub struct MockFetcher {
    pages: RwLock<HashMap<String, RenderedPage>>,
    failures: RwLock<HashSet<String>>,
    render_calls: AtomicUsize,
}

impl MockFetcher {
    /// Create an empty fetcher; unknown URLs render as unreachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a canned page for a URL.
    pub fn with_page(self, url: impl Into<String>, page: RenderedPage) -> Self {
        self.pages.write().unwrap().insert(url.into(), page);
        self
    }

    /// Make a URL fail with `FetchError::Unreachable`.
    pub fn failing_url(self, url: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(url.into());
        self
    }

    /// Replace the canned page for a URL (for redesign scenarios).
    pub fn set_page(&self, url: impl Into<String>, page: RenderedPage) {
        self.pages.write().unwrap().insert(url.into(), page);
    }

    /// Number of render calls made.
    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<RenderedPage, FetchError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.read().unwrap().contains(url) {
            return Err(FetchError::Unreachable {
                url: url.to_owned(),
            });
        }
        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Unreachable {
                url: url.to_owned(),
            })
    }
}

/// A vision model returning canned product regions.
#[derive(Default)]
pub struct MockVisionModel {
    regions: RwLock<Vec<ProductRegion>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockVisionModel {
    /// Create a vision model that locates nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve canned regions for every call.
    pub fn with_regions(self, regions: Vec<ProductRegion>) -> Self {
        *self.regions.write().unwrap() = regions;
        self
    }

    /// Make every call fail.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Number of analysis calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    async fn locate_products(
        &self,
        _screenshot: &[u8],
        _prompt: &str,
    ) -> Result<Vec<ProductRegion>, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err("mock vision failure".into());
        }
        Ok(self.regions.read().unwrap().clone())
    }
}

/// One scripted learner outcome.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    /// Succeed with these records
    Records(Vec<ProductRecord>),
    /// Fail with `LearnerFailed::NoRepeatingStructure`
    Fail,
}

/// A fully scripted learner for resolver and coordinator tests.
///
/// `learn` and `apply` each pop from their script queue, falling back to
/// a default outcome once the queue is empty. Calls are counted, and an
/// optional delay makes concurrency overlaps observable.
pub struct StubLearner {
    method: LearnerMethod,
    learn_script: Mutex<VecDeque<StubOutcome>>,
    learn_default: StubOutcome,
    apply_script: Mutex<VecDeque<StubOutcome>>,
    apply_default: StubOutcome,
    learn_delay: Option<Duration>,
    learn_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

impl StubLearner {
    /// A learner that fails every call until scripted otherwise.
    pub fn new(method: LearnerMethod) -> Self {
        Self {
            method,
            learn_script: Mutex::new(VecDeque::new()),
            learn_default: StubOutcome::Fail,
            apply_script: Mutex::new(VecDeque::new()),
            apply_default: StubOutcome::Fail,
            learn_delay: None,
            learn_calls: AtomicUsize::new(0),
            apply_calls: AtomicUsize::new(0),
        }
    }

    /// Succeed on every `learn` and `apply` with these records.
    pub fn with_learned_records(mut self, records: Vec<ProductRecord>) -> Self {
        self.learn_default = StubOutcome::Records(records.clone());
        self.apply_default = StubOutcome::Records(records);
        self
    }

    /// Script the first `learn` outcomes; the default applies afterwards.
    pub fn with_learn_script(self, outcomes: Vec<StubOutcome>) -> Self {
        *self.learn_script.lock().unwrap() = outcomes.into();
        self
    }

    /// Set the default `apply` outcome.
    pub fn with_apply_records(mut self, records: Vec<ProductRecord>) -> Self {
        self.apply_default = StubOutcome::Records(records);
        self
    }

    /// Script the first `apply` outcomes; the default applies afterwards.
    pub fn with_apply_script(self, outcomes: Vec<StubOutcome>) -> Self {
        *self.apply_script.lock().unwrap() = outcomes.into();
        self
    }

    /// Fail every call (the initial state, spelled out).
    pub fn failing(mut self) -> Self {
        self.learn_default = StubOutcome::Fail;
        self.apply_default = StubOutcome::Fail;
        self
    }

    /// Sleep inside `learn`, to make chain executions overlap in tests.
    pub fn with_learn_delay(mut self, delay: Duration) -> Self {
        self.learn_delay = Some(delay);
        self
    }

    /// Number of `learn` invocations.
    pub fn learn_calls(&self) -> usize {
        self.learn_calls.load(Ordering::SeqCst)
    }

    /// Number of `apply` invocations.
    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    fn rules(&self) -> ExtractionRules {
        match self.method {
            LearnerMethod::Pattern => ExtractionRules::Selector(SelectorRules {
                container: ".product-card".to_owned(),
                name: "h3 a".to_owned(),
                price: Some("[class*='price']".to_owned()),
                image: None,
                url: None,
                brand: None,
                model: None,
                currency_hint: None,
            }),
            LearnerMethod::Semantic => ExtractionRules::TextPattern(TextPatternRules {
                block_tag: "div".to_owned(),
                block_class: Some("offer".to_owned()),
                min_blocks: 2,
            }),
            LearnerMethod::Visual => ExtractionRules::Vision(VisionRules {
                prompt: "stub".to_owned(),
            }),
        }
    }
}

#[async_trait]
impl Learner for StubLearner {
    fn method(&self) -> LearnerMethod {
        self.method
    }

    async fn learn(&self, _page: &RenderedPage) -> LearnerResult<LearnedCandidate> {
        self.learn_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.learn_delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self
            .learn_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.learn_default.clone());
        match outcome {
            StubOutcome::Records(records) => Ok(LearnedCandidate {
                rules: self.rules(),
                records,
            }),
            StubOutcome::Fail => Err(LearnerFailed::NoRepeatingStructure),
        }
    }

    async fn apply(
        &self,
        _rules: &ExtractionRules,
        _page: &RenderedPage,
    ) -> LearnerResult<Vec<ProductRecord>> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .apply_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.apply_default.clone());
        match outcome {
            StubOutcome::Records(records) => Ok(records),
            StubOutcome::Fail => Err(LearnerFailed::NoRepeatingStructure),
        }
    }
}

/// Canned pages shared by unit and integration tests.
pub mod fixtures {
    use crate::types::page::{PageNode, RenderedPage};

    /// An empty body, for tests where page content is irrelevant.
    pub fn blank_page() -> RenderedPage {
        RenderedPage::new("https://example-shop.test/catalog", PageNode::new("body"))
    }

    /// A templated listing the pattern learner handles: repeated
    /// `.product-card` containers with name links and price spans.
    pub fn listing_page(url: &str, products: usize) -> RenderedPage {
        let cards = (0..products).map(|i| {
            PageNode::new("div").with_class("product-card").with_children([
                PageNode::new("h3").with_child(
                    PageNode::new("a")
                        .with_attr("href", format!("/p/{i}"))
                        .with_text(format!("Product {i}")),
                ),
                PageNode::new("span")
                    .with_class("price")
                    .with_text(format!("${}.00", 100 + i)),
            ])
        });
        RenderedPage::new(url, PageNode::new("body").with_children(cards))
    }

    /// An unstructured page only the semantic learner handles: repeated
    /// `div.offer` blocks with bold names and bare price text.
    pub fn price_text_page(url: &str, products: usize) -> RenderedPage {
        let blocks = (0..products).map(|i| {
            PageNode::new("div").with_class("offer").with_children([
                PageNode::new("b").with_text(format!("Deal item {i}")),
                PageNode::new("span").with_text(format!("${}.99", 50 + i)),
                PageNode::new("a")
                    .with_attr("href", format!("/deal/{i}"))
                    .with_text("View"),
            ])
        });
        RenderedPage::new(url, PageNode::new("body").with_children(blocks))
    }
}
