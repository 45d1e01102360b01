//! Page-fetcher collaborator seam.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::FetchError;
use crate::types::page::RenderedPage;

/// External page-rendering collaborator.
///
/// Implementations wrap whatever actually drives a browser (or replays
/// fixtures in tests). The engine passes its configured timeout through
/// and propagates failures without retrying; bounded retry is the outer
/// caller's policy.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Render a URL into text, structure, and (optionally) a screenshot.
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, FetchError>;
}
