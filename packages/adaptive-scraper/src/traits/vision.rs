//! Vision-model seam for the visual fallback learner.

use async_trait::async_trait;

/// A product block located in a screenshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRegion {
    /// Product name read from the region
    pub name: String,

    /// Raw price text, if legible ("$1,299.99", "499 €", ...)
    pub price_text: Option<String>,

    /// Any further text read from the region (specs, model numbers)
    pub detail_text: Option<String>,

    /// Pixel bounds `(x, y, width, height)`, when the model reports them
    pub bounds: Option<(u32, u32, u32, u32)>,
}

/// Holistic screenshot analysis, provided by the embedding application.
///
/// Implementations wrap a multimodal model provider; the engine only
/// needs located product regions with their readable text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Locate product blocks in a page screenshot.
    async fn locate_products(
        &self,
        screenshot: &[u8],
        prompt: &str,
    ) -> Result<Vec<ProductRegion>, Box<dyn std::error::Error + Send + Sync>>;
}
