use std::sync::Arc;

use bot_detect_detector::{Detector, DetectorManifest, DetectorRegistry};
use bot_detect_reputation::ReputationCache;

use crate::client_fingerprint::ClientFingerprintDetector;
use crate::handshake_storm::HandshakeStormDetector;
use crate::honeypot_path::HoneypotPathDetector;
use crate::reputation::{ReputationBiasDetector, ReputationDetector};
use crate::security_tool_ua::SecurityToolUaDetector;
use crate::ua_pattern::UaPatternDetector;
use crate::verified_bot::{KnownBot, VerifiedBotDetector};

fn manifest(
    detector: &dyn Detector,
    default_weight: f64,
    enabled: bool,
    required: bool,
) -> DetectorManifest {
    DetectorManifest {
        name: detector.name().to_string(),
        priority: detector.priority(),
        wave: detector.wave(),
        triggers: detector.triggers().to_vec(),
        emitted: detector.emitted().to_vec(),
        default_weight,
        enabled,
        required,
    }
}

/// Registers every builtin detector under its default manifest. Policies
/// that want a different weight or enablement for a detector can clone
/// the returned registry's manifests and mutate, or register over them.
pub fn register_all(registry: &mut DetectorRegistry, reputation: Arc<ReputationCache>, known_bots: Vec<KnownBot>) {
    let security_tool_ua = SecurityToolUaDetector::new();
    registry.register(manifest(&security_tool_ua, 10.0, true, true), Arc::new(security_tool_ua));

    let verified_bot = VerifiedBotDetector::new(known_bots);
    registry.register(manifest(&verified_bot, 10.0, true, false), Arc::new(verified_bot));

    let honeypot_path = HoneypotPathDetector::new();
    registry.register(manifest(&honeypot_path, 8.0, true, false), Arc::new(honeypot_path));

    let ua_pattern = UaPatternDetector::new();
    registry.register(manifest(&ua_pattern, 3.0, true, false), Arc::new(ua_pattern));

    let reputation_fastpath = ReputationDetector::new(reputation.clone());
    registry.register(manifest(&reputation_fastpath, 6.0, true, false), Arc::new(reputation_fastpath));

    let reputation_bias = ReputationBiasDetector::new(reputation);
    registry.register(manifest(&reputation_bias, 2.0, true, false), Arc::new(reputation_bias));

    let handshake_storm = HandshakeStormDetector::new();
    registry.register(manifest(&handshake_storm, 4.0, true, false), Arc::new(handshake_storm));

    let client_fingerprint = ClientFingerprintDetector::new();
    registry.register(manifest(&client_fingerprint, 3.0, true, false), Arc::new(client_fingerprint));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_all_populates_expected_names() {
        let mut registry = DetectorRegistry::new();
        register_all(&mut registry, Arc::new(ReputationCache::new()), Vec::new());
        assert!(registry.contains("security_tool_ua"));
        assert!(registry.contains("verified_bot"));
        assert!(registry.contains("honeypot_path"));
        assert!(registry.contains("ua_pattern"));
        assert!(registry.contains("reputation_fastpath"));
        assert!(registry.contains("reputation_bias"));
        assert!(registry.contains("handshake_storm"));
        assert!(registry.contains("client_fingerprint"));
        assert_eq!(registry.len(), 8);
    }
}
