use async_trait::async_trait;
use bot_detect_detector::{BotType, Detector, DetectionContribution, DetectorClass, DetectorState};
use bot_detect_signal::{SignalKey, SignalPattern};

/// Wave 1: a burst of WebSocket upgrades from one signature in the
/// coordinator's window. `CoordinatorQuery` only exposes a general
/// request count rather than an upgrade-specific one, so this detector
/// only fires when the *current* request is itself an upgrade and the
/// window count already looks like a storm — an approximation of the
/// true "15 upgrades in 60s" count, not an exact replay of it.
pub struct HandshakeStormDetector {
    min_upgrades: usize,
    emitted: Vec<SignalKey>,
}

impl HandshakeStormDetector {
    pub fn new() -> Self {
        Self { min_upgrades: 15, emitted: vec![SignalKey::new("stream.handshake_storm")] }
    }
}

#[async_trait]
impl Detector for HandshakeStormDetector {
    fn name(&self) -> &str {
        "handshake_storm"
    }
    fn wave(&self) -> u32 {
        1
    }
    fn priority(&self) -> i32 {
        30
    }
    fn triggers(&self) -> &[SignalPattern] {
        &[]
    }
    fn emitted(&self) -> &[SignalKey] {
        &self.emitted
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution> {
        if !state.request.is_websocket_upgrade {
            return Vec::new();
        }
        let count = state.coordinator.request_count_in_window(state.signature);
        if count < self.min_upgrades {
            return Vec::new();
        }
        state.sink.raise(SignalKey::new("stream.handshake_storm"), true, self.name());
        vec![DetectionContribution::new(self.name(), DetectorClass::Behavioral)
            .with_delta(0.6)
            .with_weight(4.0)
            .with_bot_type(BotType::MaliciousBot)
            .with_reason(format!("{count} websocket upgrades from this signature in the tracking window"))]
    }
}

impl Default for HandshakeStormDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_detect_detector::RequestSnapshot;
    use bot_detect_signal::SignalSink;
    use std::net::IpAddr;

    struct FixedCountQuery(usize);
    impl bot_detect_detector::CoordinatorQuery for FixedCountQuery {
        fn path_entropy(&self, _signature: &str) -> Option<f64> {
            None
        }
        fn timing_cv(&self, _signature: &str) -> Option<f64> {
            None
        }
        fn avg_bot_probability(&self, _signature: &str) -> Option<f64> {
            None
        }
        fn is_aberrant(&self, _signature: &str) -> bool {
            false
        }
        fn request_count_in_window(&self, _signature: &str) -> usize {
            self.0
        }
    }

    fn upgrade_snapshot() -> RequestSnapshot {
        RequestSnapshot {
            request_id: "r1".into(),
            path: "/ws".into(),
            method: "GET".into(),
            ip: "1.2.3.4".parse::<IpAddr>().unwrap(),
            user_agent: "x".into(),
            headers: Default::default(),
            received_at: chrono::Utc::now(),
            is_websocket_upgrade: true,
            client_fingerprint: None,
        }
    }

    #[tokio::test]
    async fn burst_of_upgrades_triggers_contribution() {
        let detector = HandshakeStormDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = FixedCountQuery(20);
        let request = upgrade_snapshot();
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        let contributions = detector.contribute(&detector_state).await;
        assert_eq!(contributions.len(), 1);
    }

    #[tokio::test]
    async fn few_upgrades_is_no_signal() {
        let detector = HandshakeStormDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = FixedCountQuery(3);
        let request = upgrade_snapshot();
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        assert!(detector.contribute(&detector_state).await.is_empty());
    }
}
