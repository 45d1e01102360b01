//! Product records and extraction results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::strategy::LearnerMethod;

/// A scalar attribute value extracted from a product block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// One extracted product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product name (required; records without a name are dropped)
    pub name: String,

    /// Numeric price, if one was found
    pub price: Option<f64>,

    /// ISO currency code ("USD" when nothing better was detected)
    pub currency: String,

    /// Manufacturer part number / model id, or a stable fallback hash
    pub model_id: Option<String>,

    /// Brand, when a selector or pattern surfaced one
    pub brand: Option<String>,

    /// Absolute URL of the product detail page
    pub product_url: Option<String>,

    /// Absolute URL of the product image
    pub image_url: Option<String>,

    /// Extracted specification attributes (capacity, noise level, ...)
    #[serde(default)]
    pub attributes: IndexMap<String, AttrValue>,
}

impl ProductRecord {
    /// Create a record with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: None,
            currency: "USD".to_owned(),
            model_id: None,
            brand: None,
            product_url: None,
            image_url: None,
            attributes: IndexMap::new(),
        }
    }

    /// Set the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the currency code.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the brand.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the record has both a non-empty name and a numeric price.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.price.is_some()
    }
}

/// Output of applying a strategy (or running the learner chain) on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted products, in page order
    pub records: Vec<ProductRecord>,

    /// Plausibility score in [0, 1]
    pub confidence: f64,

    /// The learner method that produced the records
    pub method: LearnerMethod,

    /// Set when the result did not clear the acceptance threshold
    pub low_confidence: bool,
}

impl ExtractionResult {
    /// Create a result from records and their score.
    pub fn new(records: Vec<ProductRecord>, confidence: f64, method: LearnerMethod) -> Self {
        Self {
            records,
            confidence,
            method,
            low_confidence: false,
        }
    }

    /// An empty, zero-confidence result.
    pub fn empty(method: LearnerMethod) -> Self {
        Self {
            records: Vec::new(),
            confidence: 0.0,
            method,
            low_confidence: true,
        }
    }

    /// Tag the result as below the acceptance threshold.
    pub fn tagged_low_confidence(mut self) -> Self {
        self.low_confidence = true;
        self
    }

    /// Number of extracted records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were extracted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_complete() {
        let named = ProductRecord::new("Quiet Fridge");
        assert!(!named.is_complete());

        let priced = ProductRecord::new("Quiet Fridge").with_price(499.0);
        assert!(priced.is_complete());

        let blank = ProductRecord::new("  ").with_price(499.0);
        assert!(!blank.is_complete());
    }

    #[test]
    fn test_attr_value_serializes_as_scalar() {
        let record = ProductRecord::new("TV")
            .with_attribute("screen_size", 55.0)
            .with_attribute("panel_type", "OLED")
            .with_attribute("frost_free", true);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["attributes"]["screen_size"], 55.0);
        assert_eq!(json["attributes"]["panel_type"], "OLED");
        assert_eq!(json["attributes"]["frost_free"], true);
    }

    #[test]
    fn test_empty_result_is_low_confidence() {
        let result = ExtractionResult::empty(LearnerMethod::Pattern);
        assert!(result.is_empty());
        assert!(result.low_confidence);
        assert_eq!(result.confidence, 0.0);
    }
}
