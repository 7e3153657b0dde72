//! Folds the ordered list of detector contributions the orchestrator
//! collects in one wave pass into a single [`Verdict`].

mod aggregate;
mod verdict;

pub use aggregate::{AggregationConfig, ContributionAggregator};
pub use verdict::{RecommendedAction, RiskBand, Verdict};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bot_detect_detector::{BotType, DetectionContribution, DetectorClass};

    use super::*;

    fn config() -> (HashMap<RiskBand, RecommendedAction>, HashMap<String, f64>) {
        (HashMap::new(), HashMap::new())
    }

    #[test]
    fn empty_contributions_yield_neutral_verdict() {
        let (overrides, weights) = config();
        let cfg = AggregationConfig {
            coverage_baseline: 3.0,
            min_confidence: 0.5,
            action_overrides: &overrides,
            weight_override: &weights,
        };
        let verdict = ContributionAggregator::aggregate(&[], &cfg);
        assert_eq!(verdict.bot_probability, 0.5);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.action, RecommendedAction::Allow);
    }

    #[test]
    fn verified_bad_forces_high_probability() {
        let (overrides, weights) = config();
        let cfg = AggregationConfig {
            coverage_baseline: 3.0,
            min_confidence: 0.5,
            action_overrides: &overrides,
            weight_override: &weights,
        };
        let c = DetectionContribution::new("security_tool_ua", DetectorClass::Ua)
            .with_delta(1.0)
            .with_weight(5.0)
            .with_bot_type(BotType::MaliciousBot)
            .verified_bad();
        let verdict = ContributionAggregator::aggregate(&[c], &cfg);
        assert!(verdict.bot_probability >= 0.95);
    }

    #[test]
    fn verified_good_forces_low_probability() {
        let (overrides, weights) = config();
        let cfg = AggregationConfig {
            coverage_baseline: 3.0,
            min_confidence: 0.5,
            action_overrides: &overrides,
            weight_override: &weights,
        };
        let c = DetectionContribution::new("crypto_verified_bot", DetectorClass::Heuristic)
            .with_delta(-1.0)
            .with_weight(5.0)
            .verified_good();
        let verdict = ContributionAggregator::aggregate(&[c], &cfg);
        assert!(verdict.bot_probability <= 0.05);
    }

    #[test]
    fn probability_and_confidence_stay_in_unit_range() {
        let (overrides, weights) = config();
        let cfg = AggregationConfig {
            coverage_baseline: 3.0,
            min_confidence: 0.5,
            action_overrides: &overrides,
            weight_override: &weights,
        };
        let contributions = vec![
            DetectionContribution::new("ua_pattern", DetectorClass::Ua).with_delta(0.6).with_weight(2.0),
            DetectionContribution::new("geo_ip", DetectorClass::Ip).with_delta(-0.2).with_weight(1.0),
            DetectionContribution::new("behavioral_timing", DetectorClass::Behavioral)
                .with_delta(0.9)
                .with_weight(3.0),
        ];
        let verdict = ContributionAggregator::aggregate(&contributions, &cfg);
        assert!((0.0..=1.0).contains(&verdict.bot_probability));
        assert!((0.0..=1.0).contains(&verdict.confidence));
    }

    #[test]
    fn dominant_bot_type_prefers_higher_specificity_on_tie() {
        let (overrides, weights) = config();
        let cfg = AggregationConfig {
            coverage_baseline: 3.0,
            min_confidence: 0.5,
            action_overrides: &overrides,
            weight_override: &weights,
        };
        let contributions = vec![
            DetectionContribution::new("scraper_ua", DetectorClass::Ua)
                .with_delta(0.5)
                .with_weight(2.0)
                .with_bot_type(BotType::Scraper),
            DetectionContribution::new("monitoring_ua", DetectorClass::Ua)
                .with_delta(0.5)
                .with_weight(2.0)
                .with_bot_type(BotType::Monitoring),
        ];
        let verdict = ContributionAggregator::aggregate(&contributions, &cfg);
        assert_eq!(verdict.bot_type, BotType::Scraper);
    }

    #[test]
    fn risk_band_boundaries_match_spec_table() {
        assert_eq!(RiskBand::from_probability(0.0), RiskBand::VeryLow);
        assert_eq!(RiskBand::from_probability(0.19), RiskBand::VeryLow);
        assert_eq!(RiskBand::from_probability(0.2), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.35), RiskBand::Elevated);
        assert_eq!(RiskBand::from_probability(0.5), RiskBand::Medium);
        assert_eq!(RiskBand::from_probability(0.65), RiskBand::High);
        assert_eq!(RiskBand::from_probability(0.8), RiskBand::VeryHigh);
        assert_eq!(RiskBand::from_probability(1.0), RiskBand::VeryHigh);
    }
}
