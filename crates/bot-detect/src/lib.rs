//! Facade crate: the single dependency a host application adds to get
//! the whole bot-detection engine — configuration loading, the built-in
//! detector/policy sets, and the blackboard orchestrator — behind one
//! `Engine` entry point. Individual crates stay usable standalone for
//! anyone who wants to swap a piece out (a custom policy set, a
//! different detector roster); this crate just wires the defaults
//! together the way a host usually wants them.

use std::sync::Arc;

use bot_detect_builtin::KnownBot;
use bot_detect_config::EngineConfig;
use bot_detect_detector::DetectorRegistry;
use bot_detect_errors::PolicyConfigError;
use bot_detect_identity::IdentitySalt;
use bot_detect_policy::PolicyRegistry;
use bot_detect_reputation::ReputationCache;

pub use bot_detect_aggregator::{AggregationConfig, ContributionAggregator, RecommendedAction, RiskBand, Verdict};
pub use bot_detect_builtin::register_all as register_builtin_detectors;
pub use bot_detect_cluster::{Cluster, ClusterConfig, ClusterEngine, ClusterSnapshot};
pub use bot_detect_config::{ConfigError, PathPolicyEntry};
pub use bot_detect_coordinator::{BehaviorSnapshot, CoordinatorConfig, RequestSummary, SignatureCoordinator};
pub use bot_detect_detector::{
    BotType, ClientFingerprint, CoordinatorQuery, Detector, DetectorClass, DetectorManifest,
    DetectionContribution, DetectorState, RequestSnapshot, Verified,
};
pub use bot_detect_fastpath::{FastPathSignatureMatcher, IdentityInputs, MatchOutcome};
pub use bot_detect_identity::Signature;
pub use bot_detect_orchestrator::{BlackboardOrchestrator, DetectionOutcome, EngineServices};
pub use bot_detect_policy::{
    builtin_registry, default_policy, relaxed_policy, strict_policy, allow_verified_bots_policy, Policy,
    PolicyBuilder,
};
pub use bot_detect_reputation::{ReputationConfig, ReputationPattern, ReputationState};
pub use bot_detect_response::{
    OperationSummary, ResponseAction, ResponseAnalysisContext, ResponseInput, ResponseMode, Thoroughness,
};
pub use bot_detect_signal::{SignalKey, SignalPattern, SignalPayload, SignalSink, SinkStats};

/// Builds an [`EngineServices`] bundle and its [`BlackboardOrchestrator`]
/// from an [`EngineConfig`], the built-in policy set, and the built-in
/// detector roster — the shape most hosts want without touching any
/// individual crate directly.
pub struct Engine {
    orchestrator: BlackboardOrchestrator,
    services: Arc<EngineServices>,
}

impl Engine {
    /// Registers every built-in detector, loads the four built-in
    /// policies plus any path-to-policy overrides from `config`, and
    /// validates the resulting registry before constructing the
    /// orchestrator. Returns `Err` only for the startup-fatal
    /// [`PolicyConfigError`] cases §7 reserves for config, never for the
    /// hot path.
    pub fn new(config: EngineConfig, known_bots: Vec<KnownBot>) -> Result<Self, PolicyConfigError> {
        let reputation = Arc::new(ReputationCache::with_config(config.reputation.clone()));

        let mut detectors = DetectorRegistry::new();
        register_builtin_detectors(&mut detectors, reputation.clone(), known_bots);

        // `builtin_registry()` always names `default` as the registry's
        // fallback policy; rebuild around `config.default_policy_name`
        // instead of hard-coding it, so a host config that picks
        // `strict` as its default actually gets it.
        let named = [default_policy(), strict_policy(), relaxed_policy(), allow_verified_bots_policy()];
        let chosen = named
            .iter()
            .find(|p| p.name == config.default_policy_name)
            .cloned()
            .ok_or(PolicyConfigError::MissingDefaultPolicy)?;
        let mut policies = PolicyRegistry::new(chosen);
        for policy in named {
            if policy.name != config.default_policy_name {
                policies.add_policy(policy);
            }
        }
        policies.map_path("/**", &config.default_policy_name);
        for entry in &config.path_policy_map {
            policies.map_path(&entry.pattern, &entry.policy_name);
        }
        policies.validate_against(&detectors)?;

        let services = Arc::new(EngineServices::new(
            Arc::new(policies),
            Arc::new(detectors),
            IdentitySalt::new(&config.identity_salt),
            config.coordinator,
            config.cluster,
            config.reputation,
            config.max_parallelism,
        ));

        Ok(Self { orchestrator: BlackboardOrchestrator::new(services.clone()), services })
    }

    pub fn orchestrator(&self) -> &BlackboardOrchestrator {
        &self.orchestrator
    }

    pub fn services(&self) -> &Arc<EngineServices> {
        &self.services
    }

    /// Convenience wrapper for callers that only need a fresh policy
    /// registry and detector roster, bypassing `EngineConfig` — e.g. the
    /// load-test tool, which talks to a running server over HTTP rather
    /// than embedding the engine.
    pub fn path_mapped_registry(default_policy_name: &str, overrides: &[PathPolicyEntry]) -> Option<PolicyRegistry> {
        let mut registry = builtin_registry();
        if registry.policy(default_policy_name).is_none() {
            return None;
        }
        for entry in overrides {
            registry.map_path(&entry.pattern, &entry.policy_name);
        }
        Some(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn engine_builds_and_answers_a_basic_request() {
        let mut config = EngineConfig::from_env().unwrap_or_else(|_| panic!("dev default should always load"));
        config.default_policy_name = "default".to_string();

        let engine = Engine::new(config, Vec::new()).expect("builtin policy/detector set validates");

        let request = bot_detect_detector::RequestSnapshot {
            request_id: "req-1".into(),
            path: "/".into(),
            method: "GET".into(),
            ip: "203.0.113.7".parse().unwrap(),
            user_agent: "curl/8.0".into(),
            headers: Default::default(),
            received_at: chrono::Utc::now(),
            is_websocket_upgrade: false,
            client_fingerprint: None,
        };

        let outcome = engine.orchestrator().detect(request).await;
        assert!((0.0..=1.0).contains(&outcome.verdict.bot_probability));
    }
}
