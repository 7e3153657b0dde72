//! The blackboard orchestrator: wires detectors, policy, aggregation,
//! the fast path, and the auxiliary engines (coordinator, cluster,
//! reputation, response) into the wave-based detection algorithm.

mod orchestrator;
mod outcome;
mod services;
mod subnet;

pub use orchestrator::BlackboardOrchestrator;
pub use outcome::DetectionOutcome;
pub use services::EngineServices;

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::Arc;

    use async_trait::async_trait;
    use bot_detect_aggregator::RecommendedAction;
    use bot_detect_detector::{
        DetectionContribution, Detector, DetectorClass, DetectorManifest, DetectorRegistry,
        DetectorState, RequestSnapshot,
    };
    use bot_detect_identity::IdentitySalt;
    use bot_detect_policy::{PolicyBuilder, PolicyRegistry};
    use bot_detect_signal::{SignalKey, SignalPattern};
    use chrono::Utc;

    use super::*;

    struct AlwaysBot;

    #[async_trait]
    impl Detector for AlwaysBot {
        fn name(&self) -> &str {
            "always_bot"
        }
        fn wave(&self) -> u32 {
            0
        }
        fn priority(&self) -> i32 {
            0
        }
        fn triggers(&self) -> &[SignalPattern] {
            &[]
        }
        fn emitted(&self) -> &[SignalKey] {
            &[]
        }
        async fn contribute(&self, _state: &DetectorState<'_>) -> Vec<DetectionContribution> {
            vec![DetectionContribution::new("always_bot", DetectorClass::Heuristic)
                .with_delta(1.0)
                .with_weight(5.0)
                .with_reason("always flags")
                .verified_bad()]
        }
    }

    fn request(ip: &str) -> RequestSnapshot {
        RequestSnapshot {
            request_id: "req-1".into(),
            path: "/".into(),
            method: "GET".into(),
            ip: ip.parse::<IpAddr>().unwrap(),
            user_agent: "curl/8.0".into(),
            headers: Default::default(),
            received_at: Utc::now(),
            is_websocket_upgrade: false,
            client_fingerprint: None,
        }
    }

    fn test_services() -> Arc<EngineServices> {
        let mut detectors = DetectorRegistry::new();
        detectors.register(
            DetectorManifest {
                name: "always_bot".into(),
                priority: 0,
                wave: 0,
                triggers: Vec::new(),
                emitted: Vec::new(),
                default_weight: 5.0,
                enabled: true,
                required: false,
            },
            Arc::new(AlwaysBot),
        );

        let policy = PolicyBuilder::new("default")
            .fast_path(["always_bot"])
            .min_confidence(0.2)
            .build();
        let policies = PolicyRegistry::new(policy);

        Arc::new(EngineServices::new(
            Arc::new(policies),
            Arc::new(detectors),
            IdentitySalt::new("test-secret"),
            bot_detect_coordinator::CoordinatorConfig::default(),
            bot_detect_cluster::ClusterConfig::default(),
            bot_detect_reputation::ReputationConfig::default(),
            4,
        ))
    }

    #[tokio::test]
    async fn verified_bad_contribution_drives_block_verdict() {
        let orchestrator = BlackboardOrchestrator::new(test_services());
        let outcome = orchestrator.detect(request("203.0.113.9")).await;
        assert!(outcome.verdict.bot_probability >= 0.95);
        assert_eq!(outcome.verdict.action, RecommendedAction::Block);
    }

    #[tokio::test]
    async fn distinct_ips_get_distinct_signatures_and_pattern_ids() {
        let orchestrator = BlackboardOrchestrator::new(test_services());
        let a = orchestrator.detect(request("203.0.113.9")).await;
        let b = orchestrator.detect(request("198.51.100.1")).await;
        assert_ne!(a.signature, b.signature);
        assert_ne!(a.reputation_pattern_id, b.reputation_pattern_id);
    }

    #[tokio::test]
    async fn record_outcome_feeds_the_reputation_cache() {
        let services = test_services();
        let orchestrator = BlackboardOrchestrator::new(services.clone());
        let outcome = orchestrator.detect(request("203.0.113.9")).await;
        orchestrator.record_outcome("/", &outcome, 0, 0);
        assert!(services.reputation.query(&outcome.reputation_pattern_id).is_some());
    }

    #[tokio::test]
    async fn cancellation_short_circuits_with_a_neutral_verdict() {
        let orchestrator = BlackboardOrchestrator::new(test_services());
        let cancelled = std::sync::atomic::AtomicBool::new(true);
        let outcome = orchestrator.detect_with_cancellation(request("203.0.113.9"), Some(&cancelled)).await;
        assert_eq!(outcome.verdict.action, RecommendedAction::LogOnly);
    }
}
