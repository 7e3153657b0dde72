use std::sync::Arc;

use bot_detect_cluster::ClusterEngine;
use bot_detect_coordinator::SignatureCoordinator;
use bot_detect_detector::DetectorRegistry;
use bot_detect_fastpath::FastPathSignatureMatcher;
use bot_detect_identity::IdentitySalt;
use bot_detect_policy::PolicyRegistry;
use bot_detect_reputation::ReputationCache;
use bot_detect_response::ResponseDetectionCoordinator;
use bot_detect_signal::SignalSink;

/// Every process-scoped collaborator the orchestrator fans out to,
/// constructed once at startup and shared behind `Arc`s. Mirrors §9's
/// "explicit process-scoped services with documented init/teardown, no
/// hidden singletons" note — nothing here is a lazily-initialised
/// global.
pub struct EngineServices {
    pub policies: Arc<PolicyRegistry>,
    pub detectors: Arc<DetectorRegistry>,
    pub fastpath: Arc<FastPathSignatureMatcher>,
    pub coordinator: Arc<SignatureCoordinator>,
    pub cluster: Arc<ClusterEngine>,
    pub reputation: Arc<ReputationCache>,
    pub response: Arc<ResponseDetectionCoordinator>,
    pub global_sink: Arc<SignalSink>,
    pub identity_salt: IdentitySalt,
    pub max_parallelism: usize,
}

impl EngineServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policies: Arc<PolicyRegistry>,
        detectors: Arc<DetectorRegistry>,
        identity_salt: IdentitySalt,
        coordinator_config: bot_detect_coordinator::CoordinatorConfig,
        cluster_config: bot_detect_cluster::ClusterConfig,
        reputation_config: bot_detect_reputation::ReputationConfig,
        max_parallelism: usize,
    ) -> Self {
        let global_sink = Arc::new(SignalSink::global());
        Self {
            policies,
            detectors,
            fastpath: Arc::new(FastPathSignatureMatcher::new(identity_salt.clone())),
            coordinator: Arc::new(SignatureCoordinator::with_config(global_sink.clone(), coordinator_config)),
            cluster: Arc::new(ClusterEngine::new(cluster_config)),
            reputation: Arc::new(ReputationCache::with_config(reputation_config)),
            response: Arc::new(ResponseDetectionCoordinator::new()),
            global_sink,
            identity_salt,
            max_parallelism,
        }
    }
}
