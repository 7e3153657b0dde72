use std::collections::{HashMap, HashSet};

use bot_detect_detector::{BotType, DetectionContribution, Verified};

use crate::verdict::{RecommendedAction, RiskBand, Verdict};

/// Tunables the orchestrator pulls out of the resolved [`Policy`] and
/// passes in here, keeping this crate free of a dependency on the
/// policy crate (contributions flow downhill; policy stays upstream).
pub struct AggregationConfig<'a> {
    pub coverage_baseline: f64,
    pub min_confidence: f64,
    pub action_overrides: &'a HashMap<RiskBand, RecommendedAction>,
    /// Per-detector weight override, falling back to the contribution's
    /// own `weight` field when absent.
    pub weight_override: &'a HashMap<String, f64>,
}

impl<'a> AggregationConfig<'a> {
    fn weight_for(&self, contribution: &DetectionContribution) -> f64 {
        self.weight_override.get(&contribution.detector_name).copied().unwrap_or(contribution.weight)
    }
}

/// Folds detector contributions into the final verdict per §4.5.
pub struct ContributionAggregator;

impl ContributionAggregator {
    pub fn aggregate(contributions: &[DetectionContribution], config: &AggregationConfig<'_>) -> Verdict {
        if contributions.is_empty() {
            return Verdict::neutral();
        }

        let weights: Vec<f64> = contributions.iter().map(|c| config.weight_for(c).max(0.0)).collect();
        let total_weight: f64 = weights.iter().sum();

        let bot_probability = Self::bot_probability(contributions, &weights, total_weight);
        let confidence = Self::confidence(contributions, &weights, total_weight, config.coverage_baseline);
        let risk_band = RiskBand::from_probability(bot_probability);

        let mut action = Self::default_action(risk_band, confidence, config.min_confidence);
        if let Some(override_action) = config.action_overrides.get(&risk_band) {
            action = *override_action;
        }

        let (bot_type, bot_name) = Self::dominant_bot_type(contributions, &weights);
        let reasons = Self::top_reasons(contributions, &weights);

        Verdict {
            bot_probability,
            confidence,
            risk_band,
            action,
            bot_type,
            bot_name,
            reasons,
            timed_out: false,
        }
    }

    fn bot_probability(contributions: &[DetectionContribution], weights: &[f64], total_weight: f64) -> f64 {
        // VerifiedBad/VerifiedGood are cryptographic or administrative
        // verifications, not ordinary votes — they force the verdict
        // regardless of what else contributed (invariant 6, §8).
        if contributions.iter().any(|c| c.verified == Verified::VerifiedBad) {
            return 0.98;
        }
        if contributions.iter().any(|c| c.verified == Verified::VerifiedGood) {
            return 0.02;
        }
        if total_weight <= 0.0 {
            return 0.5;
        }
        let weighted_sum: f64 = contributions
            .iter()
            .zip(weights)
            .map(|(c, w)| w * (0.5 + 0.5 * c.confidence_delta))
            .sum();
        (weighted_sum / total_weight).clamp(0.0, 1.0)
    }

    fn confidence(
        contributions: &[DetectionContribution],
        weights: &[f64],
        total_weight: f64,
        baseline: f64,
    ) -> f64 {
        if total_weight <= 0.0 {
            return 0.0;
        }
        let signed_sum: f64 =
            contributions.iter().zip(weights).map(|(c, w)| c.confidence_delta * w).sum();
        let agreement = (signed_sum.abs() / total_weight).clamp(0.0, 1.0);
        let coverage = (total_weight / baseline.max(f64::EPSILON)).min(1.0);

        let distinct_detectors: HashSet<&str> =
            contributions.iter().map(|c| c.detector_name.as_str()).collect();
        let diversity = (distinct_detectors.len() as f64 / 4.0).min(1.0);

        let raw = 0.40 * agreement + 0.35 * coverage + 0.25 * diversity;

        let distinct_classes: HashSet<_> = contributions.iter().map(|c| c.category).collect();
        // Confidence cannot exceed what the evidence-class coverage can
        // support: running detectors from every class earns the full
        // score, a single class caps it.
        let class_factor = (distinct_classes.len() as f64 / 3.0).min(1.0);

        (raw * class_factor.max(0.34)).clamp(0.0, 1.0)
    }

    fn default_action(risk_band: RiskBand, confidence: f64, min_confidence: f64) -> RecommendedAction {
        match risk_band {
            RiskBand::VeryHigh | RiskBand::High if confidence >= min_confidence => {
                RecommendedAction::Block
            }
            RiskBand::VeryHigh | RiskBand::High => RecommendedAction::Challenge,
            RiskBand::Medium => RecommendedAction::Challenge,
            RiskBand::Elevated => RecommendedAction::Throttle,
            RiskBand::Low | RiskBand::VeryLow => RecommendedAction::Allow,
        }
    }

    fn dominant_bot_type(
        contributions: &[DetectionContribution],
        weights: &[f64],
    ) -> (BotType, Option<String>) {
        let mut best: Option<(f64, BotType, &str)> = None;
        for (c, w) in contributions.iter().zip(weights) {
            if c.bot_type == BotType::Human {
                continue;
            }
            let candidate = (*w, c.bot_type, c.detector_name.as_str());
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if candidate.0 > current.0
                        || (candidate.0 == current.0 && candidate.1.specificity() > current.1.specificity())
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
        match best {
            Some((_, bot_type, name)) => (bot_type, Some(name.to_string())),
            None => (BotType::Human, None),
        }
    }

    fn top_reasons(contributions: &[DetectionContribution], weights: &[f64]) -> Vec<String> {
        let mut ranked: Vec<(f64, &str)> = contributions
            .iter()
            .zip(weights)
            .filter(|(c, _)| !c.reason.is_empty())
            .map(|(c, w)| (*w, c.reason.as_str()))
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.into_iter().take(5).map(|(_, reason)| reason.to_string()).collect()
    }
}
