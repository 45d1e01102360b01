//! The engine facade - the tool-style surface callers embed.

use std::sync::Arc;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::learners::LearnerChain;
use crate::pipeline::coordinate::DomainCoordinator;
use crate::pipeline::resolve::StrategyResolver;
use crate::traits::{fetcher::PageFetcher, store::StrategyStore, vision::VisionModel};
use crate::types::{
    config::EngineConfig,
    domain::Domain,
    page::RenderedPage,
    product::ExtractionResult,
    strategy::{ScrapingStrategy, StrategyHealth},
};

/// The adaptive scraping strategy engine.
///
/// # Example
///
/// ```rust,ignore
/// use adaptive_scraper::{Engine, MemoryStrategyStore};
///
/// let engine = Engine::new(MemoryStrategyStore::new(), fetcher, vision);
///
/// // First call learns a strategy for the domain; later calls reuse it
/// let result = engine.scrape("https://example-shop.test/catalog").await?;
/// for product in &result.records {
///     println!("{} {:?} {}", product.name, product.price, product.currency);
/// }
/// ```
pub struct Engine<S: StrategyStore, F: PageFetcher> {
    store: Arc<S>,
    fetcher: F,
    coordinator: DomainCoordinator<S>,
    config: EngineConfig,
}

impl<S: StrategyStore, F: PageFetcher> Engine<S, F> {
    /// Create an engine with the standard learner chain and defaults.
    pub fn new(store: S, fetcher: F, vision: Arc<dyn VisionModel>) -> Self {
        Self::with_config(store, fetcher, vision, EngineConfig::default())
    }

    /// Create an engine with the standard chain and a custom config.
    pub fn with_config(
        store: S,
        fetcher: F,
        vision: Arc<dyn VisionModel>,
        config: EngineConfig,
    ) -> Self {
        Self::with_chain(store, fetcher, LearnerChain::standard(vision), config)
    }

    /// Create an engine with an explicit learner chain.
    pub fn with_chain(store: S, fetcher: F, chain: LearnerChain, config: EngineConfig) -> Self {
        let store = Arc::new(store);
        let resolver = StrategyResolver::new(Arc::clone(&store), chain, config.clone());
        let coordinator = DomainCoordinator::new(resolver, &config);
        Self {
            store,
            fetcher,
            coordinator,
            config,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying page fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Render a URL and extract products from it.
    ///
    /// The domain key is derived from the URL, so callers cannot pass a
    /// mismatched pair. Fetch failures propagate without retry.
    pub async fn scrape(&self, url: &str) -> Result<ExtractionResult> {
        let domain = Domain::parse(url).ok_or_else(|| EngineError::InvalidDomain {
            input: url.to_owned(),
        })?;
        debug!(url, domain = %domain, "rendering page");
        let page = self.fetcher.render(url, self.config.fetch_timeout).await?;
        self.coordinator.extract(&domain, &page).await
    }

    /// Extract products from an already rendered page.
    pub async fn scrape_page(
        &self,
        domain: &Domain,
        page: &RenderedPage,
    ) -> Result<ExtractionResult> {
        self.coordinator.extract(domain, page).await
    }

    /// Current strategy for a domain, for introspection and debugging.
    pub async fn strategy(&self, domain: &Domain) -> Result<Option<ScrapingStrategy>> {
        Ok(self.store.get(domain).await?.map(|record| record.strategy))
    }

    /// Current health metrics for a domain.
    pub async fn health(&self, domain: &Domain) -> Result<Option<StrategyHealth>> {
        Ok(self.store.get(domain).await?.map(|record| record.health))
    }

    /// All persisted strategy versions for a domain, oldest first.
    pub async fn strategy_history(&self, domain: &Domain) -> Result<Vec<ScrapingStrategy>> {
        Ok(self.store.history(domain).await?)
    }

    /// Administrative cache bust: the next scrape treats the domain as
    /// unseen. History is kept.
    pub async fn invalidate_strategy(&self, domain: &Domain) -> Result<()> {
        Ok(self.store.invalidate(domain).await?)
    }

    /// Administrative hard delete of everything known about a domain.
    pub async fn purge_strategy(&self, domain: &Domain) -> Result<()> {
        Ok(self.store.purge(domain).await?)
    }
}
