//! Confidence scoring - a pure function over extraction output.
//!
//! Deterministic by construction: no clocks, no randomness, no external
//! state. The same records always score the same, which keeps learner
//! comparisons fair and tests reproducible.

use crate::types::{config::ScoreConfig, product::ProductRecord};

const COMPLETENESS_WEIGHT: f64 = 0.5;
const PLAUSIBILITY_WEIGHT: f64 = 0.3;
const VOLUME_WEIGHT: f64 = 0.2;

/// Score an extraction attempt's plausibility in [0, 1].
///
/// Blends three signals: the fraction of records carrying both a name
/// and a numeric price, the fraction of prices inside the sane band,
/// and the record count relative to the configured expected minimum.
/// An empty record set scores 0.
pub fn score(records: &[ProductRecord], config: &ScoreConfig) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let total = records.len() as f64;

    let complete = records.iter().filter(|r| r.is_complete()).count() as f64;
    let completeness = complete / total;

    let priced: Vec<f64> = records.iter().filter_map(|r| r.price).collect();
    let plausibility = if priced.is_empty() {
        0.0
    } else {
        let plausible = priced
            .iter()
            .filter(|p| **p > 0.0 && **p <= config.max_plausible_price)
            .count() as f64;
        plausible / priced.len() as f64
    };

    let expected = config.expected_min_records.max(1) as f64;
    let volume = (total / expected).min(1.0);

    COMPLETENESS_WEIGHT * completeness
        + PLAUSIBILITY_WEIGHT * plausibility
        + VOLUME_WEIGHT * volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(name: &str, price: Option<f64>) -> ProductRecord {
        let mut r = ProductRecord::new(name);
        r.price = price;
        r
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(score(&[], &ScoreConfig::default()), 0.0);
    }

    #[test]
    fn test_full_listing_scores_one() {
        let records: Vec<_> = (0..6)
            .map(|i| record(&format!("Product {i}"), Some(100.0 + i as f64)))
            .collect();
        let s = score(&records, &ScoreConfig::default());
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_prices_drag_score_down() {
        let records = vec![
            record("A", Some(10.0)),
            record("B", None),
            record("C", None),
        ];
        let s = score(&records, &ScoreConfig::default());
        // completeness 1/3, plausibility 1/1, volume 1
        let expected = 0.5 / 3.0 + 0.3 + 0.2;
        assert!((s - expected).abs() < 1e-9);
    }

    #[test]
    fn test_implausible_prices_penalized() {
        let records = vec![
            record("A", Some(10.0)),
            record("B", Some(-5.0)),
            record("C", Some(5e9)),
        ];
        let s = score(&records, &ScoreConfig::default());
        // all complete, 1 of 3 plausible, volume 1
        let expected = 0.5 + 0.3 / 3.0 + 0.2;
        assert!((s - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_listing_limited_by_volume() {
        let records = vec![record("A", Some(10.0))];
        let s = score(&records, &ScoreConfig::default());
        let expected = 0.5 + 0.3 + 0.2 / 3.0;
        assert!((s - expected).abs() < 1e-9);
    }

    proptest! {
        /// Identical input always yields identical output.
        #[test]
        fn prop_score_is_deterministic(
            inputs in prop::collection::vec(
                (prop::bool::ANY, prop::option::of(-1e9f64..1e9f64)),
                0..40,
            )
        ) {
            let records: Vec<ProductRecord> = inputs
                .iter()
                .map(|(named, price)| {
                    let mut r = ProductRecord::new(if *named { "Product" } else { "" });
                    r.price = *price;
                    r
                })
                .collect();

            let config = ScoreConfig::default();
            let first = score(&records, &config);
            for _ in 0..3 {
                prop_assert_eq!(score(&records, &config), first);
            }
            prop_assert!((0.0..=1.0).contains(&first));
        }
    }
}
