use std::collections::HashMap;

use bot_detect_aggregator::{AggregationConfig, ContributionAggregator};
use bot_detect_detector::{DetectionContribution, DetectorClass};
use proptest::prelude::*;

proptest! {
    /// Invariant 1 (§8): bot probability and confidence are in [0,1] for
    /// any input, including weird weights and deltas at the edges of
    /// their domains.
    #[test]
    fn probability_and_confidence_always_bounded(
        deltas in proptest::collection::vec(-1.0f64..=1.0, 0..8),
        weights in proptest::collection::vec(0.0f64..=10.0, 0..8),
    ) {
        let n = deltas.len().min(weights.len());
        let contributions: Vec<DetectionContribution> = (0..n)
            .map(|i| {
                DetectionContribution::new(format!("d{i}"), DetectorClass::Heuristic)
                    .with_delta(deltas[i])
                    .with_weight(weights[i])
            })
            .collect();

        let overrides = HashMap::new();
        let weight_override = HashMap::new();
        let cfg = AggregationConfig {
            coverage_baseline: 3.0,
            min_confidence: 0.5,
            action_overrides: &overrides,
            weight_override: &weight_override,
        };
        let verdict = ContributionAggregator::aggregate(&contributions, &cfg);
        prop_assert!((0.0..=1.0).contains(&verdict.bot_probability));
        prop_assert!((0.0..=1.0).contains(&verdict.confidence));
    }
}
