//! Record enrichment shared by all learners: price parsing, currency
//! detection, specification-attribute extraction, and fallback ids.

use indexmap::IndexMap;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::types::product::AttrValue;

/// Price-like token: a currency symbol adjacent to digits, either side.
pub const PRICE_TOKEN_PATTERN: &str = r"[$€£¥₪]\s*\d[\d.,]*|\d[\d.,]*\s*[$€£¥₪]";

/// Extract a numeric price from text containing currency noise.
///
/// Handles both US (`1,299.99`) and European (`1.299,99`) formats, and
/// bare thousands separators (`1,299`).
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        if cleaned.rfind(',') > cleaned.rfind('.') {
            // European format: 1.299,99
            cleaned.replace('.', "").replace(',', ".")
        } else {
            // US format: 1,299.99
            cleaned.replace(',', "")
        }
    } else if cleaned.contains(',') {
        let decimal_len = cleaned.rsplit(',').next().map_or(0, str::len);
        if decimal_len == 2 {
            // Likely decimal: 12,99
            cleaned.replace(',', ".")
        } else {
            // Likely thousands: 1,299
            cleaned.replace(',', "")
        }
    } else {
        cleaned
    };

    normalized.parse::<f64>().ok()
}

/// Detect a currency code from price text.
pub fn detect_currency(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    if text.contains('₪') || upper.contains("NIS") || upper.contains("ILS") {
        Some("ILS")
    } else if text.contains('€') || upper.contains("EUR") {
        Some("EUR")
    } else if text.contains('£') || upper.contains("GBP") {
        Some("GBP")
    } else if text.contains('$') || upper.contains("USD") {
        Some("USD")
    } else {
        None
    }
}

/// Stable fallback id for records without a model number: a short hash
/// of brand + name, so the same product keys the same across scrapes.
pub fn stable_model_id(brand: Option<&str>, name: &str) -> Option<String> {
    let key = format!("{}{}", brand.unwrap_or(""), name)
        .to_lowercase()
        .trim()
        .to_owned();
    if key.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    Some(digest[..12].to_owned())
}

enum Capture {
    /// Parse capture group 1 as a number
    Number,
    /// Keep the matched text (group 1 when present, whole match otherwise)
    Text,
    /// Presence of the pattern is the value
    Flag,
}

struct AttrPattern {
    key: String,
    re: Regex,
    capture: Capture,
}

/// Compiled specification-extraction patterns, applied to block text.
///
/// Unit-driven patterns (dB, kg, W, ...) yield numbers; hand-tuned
/// patterns for complex criteria (resolution, processor, ...) yield
/// text; presence patterns (frost-free, inverter) yield flags.
pub struct AttributePatterns {
    patterns: Vec<AttrPattern>,
}

/// Pattern template for a unit string, when one exists.
fn unit_template(unit: &str) -> Option<&'static str> {
    Some(match unit {
        "dB" => r"(?i)(\d+)\s*db\b",
        "L" => r"(?i)(\d+)\s*(?:liters?|litres?|l)\b",
        "kg" => r"(?i)(\d+(?:\.\d+)?)\s*kg\b",
        "g" => r"(?i)(\d+)\s*g\b",
        "W" => r"(?i)(\d+)\s*w\b",
        "kW" => r"(?i)(\d[\d.]*)\s*kw\b",
        "BTU" => r"(?i)(\d[\d,]*)\s*btu\b",
        "RPM" => r"(?i)(\d+)\s*rpm\b",
        "Hz" => r"(?i)(\d+)\s*hz\b",
        "inches" => r#"(?i)(\d{2,3})\s*(?:["″]|inch(?:es)?)"#,
        "GB" => r"(?i)(\d+)\s*gb\b",
        "TB" => r"(?i)(\d+)\s*tb\b",
        "mm" => r"(?i)(\d+)\s*mm\b",
        "cm" => r"(?i)(\d+)\s*cm\b",
        "hours" => r"(?i)(\d+)\s*(?:hours?|hrs?)\b",
        "years" => r"(?i)(\d+)\s*(?:years?|yrs?)\b",
        _ => return None,
    })
}

/// Hand-tuned pattern for criteria a unit alone cannot match.
fn special_pattern(key: &str) -> Option<(&'static str, Capture)> {
    Some(match key {
        "resolution" => (
            r"(?i)\b(4k|8k|uhd|full\s*hd|fhd|qhd|1080p|2160p)\b",
            Capture::Text,
        ),
        "panel_type" => (
            r"(?i)\b(oled|qled|mini.?led|neo\s*qled|led|ips|va|tn)\b",
            Capture::Text,
        ),
        "energy_rating" => (r"(?i)\b(a\+{0,3}|[a-g])\s*energy\b", Capture::Text),
        "processor" => (
            r"(?i)\b(i[3579][-\s]?\d{4,5}\w*|ryzen\s*\d\s*\d{4}\w*|m[1-4]\s*(?:pro|max|ultra)?)\b",
            Capture::Text,
        ),
        "ram" => (r"(?i)(\d+)\s*gb\s*ram\b", Capture::Number),
        "storage" => (
            r"(?i)\d+\s*(?:gb|tb)\s*(?:ssd|hdd|storage)\b",
            Capture::Text,
        ),
        "noise_cancelling" => (
            r"(?i)\b(?:anc|active\s*noise\s*cancell?(?:ing|ation))\b",
            Capture::Flag,
        ),
        "frost_free" => (r"(?i)\bfrost[\s-]*free\b", Capture::Flag),
        "inverter" => (r"(?i)\binverter\b", Capture::Flag),
        "filtration" => (r"(?i)\b(hepa|h1[0-4])\b", Capture::Text),
        _ => return None,
    })
}

/// Default criteria set: common appliance and electronics specs.
const DEFAULT_CRITERIA: &[(&str, &str)] = &[
    ("noise_level", "dB"),
    ("capacity", "L"),
    ("weight", "kg"),
    ("power", "W"),
    ("cooling_capacity", "BTU"),
    ("spin_speed", "RPM"),
    ("screen_size", "inches"),
    ("resolution", ""),
    ("panel_type", ""),
    ("refresh_rate", "Hz"),
    ("energy_rating", ""),
    ("processor", ""),
    ("ram", "GB"),
    ("storage", ""),
    ("noise_cancelling", ""),
    ("frost_free", ""),
    ("inverter", ""),
    ("filtration", ""),
];

impl Default for AttributePatterns {
    fn default() -> Self {
        Self::from_units(DEFAULT_CRITERIA)
    }
}

impl AttributePatterns {
    /// Build patterns from `(criterion key, unit)` pairs.
    ///
    /// Hand-tuned patterns take precedence over the unit template;
    /// criteria with neither are skipped, as is a literal `price` key
    /// (prices are first-class, not attributes).
    pub fn from_units(criteria: &[(&str, &str)]) -> Self {
        let mut patterns = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for (key, unit) in criteria {
            if *key == "price" || !seen.insert(*key) {
                continue;
            }
            if let Some((template, capture)) = special_pattern(key) {
                patterns.push(AttrPattern {
                    key: (*key).to_owned(),
                    re: Regex::new(template).unwrap(),
                    capture,
                });
                continue;
            }
            if let Some(template) = unit_template(unit) {
                patterns.push(AttrPattern {
                    key: (*key).to_owned(),
                    re: Regex::new(template).unwrap(),
                    capture: Capture::Number,
                });
            }
        }

        Self { patterns }
    }

    /// First match per criterion across the given text.
    pub fn extract(&self, text: &str) -> IndexMap<String, AttrValue> {
        let mut out = IndexMap::new();
        for pattern in &self.patterns {
            if out.contains_key(&pattern.key) {
                continue;
            }
            let Some(caps) = pattern.re.captures(text) else {
                continue;
            };
            let value = match pattern.capture {
                Capture::Flag => Some(AttrValue::Flag(true)),
                Capture::Number => caps
                    .get(1)
                    .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
                    .map(AttrValue::Number),
                Capture::Text => caps
                    .get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| AttrValue::Text(m.as_str().trim().to_owned())),
            };
            if let Some(value) = value {
                out.insert(pattern.key.clone(), value);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_us_format() {
        assert_eq!(parse_price("$1,299.99"), Some(1299.99));
        assert_eq!(parse_price("1,299"), Some(1299.0));
        assert_eq!(parse_price("  $499  "), Some(499.0));
    }

    #[test]
    fn test_parse_price_european_format() {
        assert_eq!(parse_price("1.299,99 €"), Some(1299.99));
        assert_eq!(parse_price("12,99"), Some(12.99));
    }

    #[test]
    fn test_parse_price_rejects_nonsense() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("call for price"), None);
        assert_eq!(parse_price("..."), None);
    }

    #[test]
    fn test_detect_currency() {
        assert_eq!(detect_currency("₪1,200"), Some("ILS"));
        assert_eq!(detect_currency("1.299,99 €"), Some("EUR"));
        assert_eq!(detect_currency("£45"), Some("GBP"));
        assert_eq!(detect_currency("$499.00"), Some("USD"));
        assert_eq!(detect_currency("499 EUR"), Some("EUR"));
        assert_eq!(detect_currency("499"), None);
    }

    #[test]
    fn test_stable_model_id_is_stable() {
        let a = stable_model_id(Some("LG"), "Quiet Fridge 300L");
        let b = stable_model_id(Some("LG"), "Quiet Fridge 300L");
        assert_eq!(a, b);
        assert_eq!(a.as_ref().map(String::len), Some(12));

        assert_ne!(a, stable_model_id(Some("Bosch"), "Quiet Fridge 300L"));
        assert_eq!(stable_model_id(None, ""), None);
    }

    #[test]
    fn test_attribute_extraction_defaults() {
        let patterns = AttributePatterns::default();
        let attrs = patterns.extract(
            "55\" OLED TV, 120 Hz refresh, 38 dB quiet mode, frost free compartment",
        );

        assert_eq!(attrs.get("screen_size"), Some(&AttrValue::Number(55.0)));
        assert_eq!(
            attrs.get("panel_type"),
            Some(&AttrValue::Text("OLED".to_owned()))
        );
        assert_eq!(attrs.get("refresh_rate"), Some(&AttrValue::Number(120.0)));
        assert_eq!(attrs.get("noise_level"), Some(&AttrValue::Number(38.0)));
        assert_eq!(attrs.get("frost_free"), Some(&AttrValue::Flag(true)));
        assert!(attrs.get("ram").is_none());
    }

    #[test]
    fn test_attribute_extraction_first_match_wins() {
        let patterns = AttributePatterns::default();
        let attrs = patterns.extract("40 dB at night, 55 dB at full spin, 1400 RPM");
        assert_eq!(attrs.get("noise_level"), Some(&AttrValue::Number(40.0)));
        assert_eq!(attrs.get("spin_speed"), Some(&AttrValue::Number(1400.0)));
    }

    #[test]
    fn test_custom_criteria() {
        let patterns = AttributePatterns::from_units(&[("battery_life", "hours")]);
        let attrs = patterns.extract("up to 30 hours battery");
        assert_eq!(attrs.get("battery_life"), Some(&AttrValue::Number(30.0)));
    }
}
