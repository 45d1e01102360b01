//! Domain normalization - the key for all strategy lookups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized registrable website identifier.
///
/// Lowercased host with any `www.` prefix stripped. Accepts either a
/// bare host or a full URL, so `https://www.Example-Shop.test/sale` and
/// `example-shop.test` key the same strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Parse from a bare host or a full URL.
    ///
    /// Returns `None` when no host can be extracted.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let host = if trimmed.contains("://") {
            url::Url::parse(trimmed)
                .ok()
                .and_then(|u| u.host_str().map(str::to_owned))?
        } else if trimmed.contains('/') || trimmed.contains('?') {
            // Schemeless URL-ish input: prepend a scheme and retry
            url::Url::parse(&format!("https://{trimmed}"))
                .ok()
                .and_then(|u| u.host_str().map(str::to_owned))?
        } else {
            trimmed.to_owned()
        };

        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_owned();

        if host.is_empty() || !host.contains('.') {
            return None;
        }

        Some(Self(host))
    }

    /// The normalized host as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let domain = Domain::parse("https://www.example-shop.test/catalog?page=2").unwrap();
        assert_eq!(domain.as_str(), "example-shop.test");
    }

    #[test]
    fn test_parse_bare_host() {
        assert_eq!(
            Domain::parse("Example-Shop.test").unwrap().as_str(),
            "example-shop.test"
        );
        assert_eq!(
            Domain::parse("www.weird-shop.test").unwrap().as_str(),
            "weird-shop.test"
        );
    }

    #[test]
    fn test_parse_schemeless_url() {
        let domain = Domain::parse("shop.example.org/products/tv").unwrap();
        assert_eq!(domain.as_str(), "shop.example.org");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Domain::parse("").is_none());
        assert!(Domain::parse("   ").is_none());
        assert!(Domain::parse("localhost").is_none());
        assert!(Domain::parse("https://").is_none());
    }

    #[test]
    fn test_same_key_for_url_and_host() {
        let a = Domain::parse("https://www.example-shop.test/sale").unwrap();
        let b = Domain::parse("example-shop.test").unwrap();
        assert_eq!(a, b);
    }
}
