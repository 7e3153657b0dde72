//! Periodic/event-triggered community detection over signatures with
//! elevated bot probability, surfacing product/network clusters behind
//! an atomically-swapped snapshot.

mod cluster;
mod community;
mod country;
mod engine;
mod features;
mod graph;
mod similarity;

pub use cluster::{Cluster, ClusterClassification, ClusterId, ClusterSnapshot};
pub use community::CommunityAlgorithm;
pub use country::CountryReputationTracker;
pub use engine::{ClusterCandidate, ClusterConfig, ClusterEngine};
pub use features::{FeatureVector, SignatureContext};

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(signature: &'a str, bot_probability: f64, intervals: &'a [f64]) -> SignatureContext<'a> {
        SignatureContext {
            signature,
            timing_regularity: 0.95,
            request_rate: 8.0,
            path_diversity: 0.3,
            path_entropy: 1.2,
            avg_bot_probability: bot_probability,
            country: "US",
            is_datacenter: true,
            asn: 64512,
            inter_arrival_ms: intervals,
        }
    }

    #[test]
    fn a_pass_with_too_few_eligible_signatures_yields_empty_snapshot() {
        let engine = ClusterEngine::new(ClusterConfig::default());
        let intervals = [100.0; 10];
        engine.run_pass(vec![ClusterCandidate { context: ctx("only-one", 0.9, &intervals), semantic_summary: None }]);
        assert!(engine.snapshot().clusters.is_empty());
    }

    #[test]
    fn low_bot_probability_signatures_are_filtered_out() {
        let engine = ClusterEngine::new(ClusterConfig::default());
        let intervals = [100.0; 10];
        let candidates = (0..5)
            .map(|i| ClusterCandidate { context: ctx(Box::leak(format!("human-{i}").into_boxed_str()), 0.1, &intervals), semantic_summary: None })
            .collect();
        engine.run_pass(candidates);
        assert!(engine.snapshot().clusters.is_empty());
    }

    #[test]
    fn similar_signatures_cluster_together() {
        let engine = ClusterEngine::new(ClusterConfig::default());
        let intervals = [100.0; 10];
        let candidates = (0..4)
            .map(|i| ClusterCandidate {
                context: ctx(Box::leak(format!("bot-{i}").into_boxed_str()), 0.95, &intervals),
                semantic_summary: Some("scraper ua headless chrome".to_string()),
            })
            .collect();
        engine.run_pass(candidates);
        let snapshot = engine.snapshot();
        assert!(!snapshot.clusters.is_empty());
        assert!(snapshot.cluster_for("bot-0").is_some());
    }

    #[test]
    fn note_bot_detection_triggers_at_threshold() {
        let mut config = ClusterConfig::default();
        config.min_bot_detections_to_trigger = 3;
        let engine = ClusterEngine::new(config);
        assert!(!engine.should_run_now());
        engine.note_bot_detection();
        engine.note_bot_detection();
        engine.note_bot_detection();
        assert!(engine.should_run_now());
    }
}
