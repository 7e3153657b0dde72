use async_trait::async_trait;
use bot_detect_detector::{BotType, Detector, DetectionContribution, DetectorClass, DetectorState};
use bot_detect_signal::{SignalKey, SignalPattern};

/// Wave 1: reads the client-side fingerprint posted back via the
/// callback endpoint (merged onto the request snapshot by the
/// orchestrator once learned) and flags the combinations headless
/// automation tooling leaves behind — no canvas/webgl/audio entropy at
/// all, or a browser UA with zero installed plugins and fonts.
pub struct ClientFingerprintDetector {
    emitted: Vec<SignalKey>,
}

impl ClientFingerprintDetector {
    pub fn new() -> Self {
        Self { emitted: vec![SignalKey::new("client.headless_signal")] }
    }
}

#[async_trait]
impl Detector for ClientFingerprintDetector {
    fn name(&self) -> &str {
        "client_fingerprint"
    }
    fn wave(&self) -> u32 {
        1
    }
    fn priority(&self) -> i32 {
        40
    }
    fn triggers(&self) -> &[SignalPattern] {
        &[]
    }
    fn emitted(&self) -> &[SignalKey] {
        &self.emitted
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution> {
        let Some(fp) = &state.request.client_fingerprint else { return Vec::new() };

        let no_render_entropy = fp.canvas_hash.is_none() && fp.webgl_hash.is_none() && fp.audio_hash.is_none();
        let no_plugins_or_fonts = fp.plugins.is_empty() && fp.fonts.is_empty();

        if !no_render_entropy && !no_plugins_or_fonts {
            return Vec::new();
        }

        let reason = if no_render_entropy && no_plugins_or_fonts {
            "no canvas/webgl/audio entropy and no plugins or fonts reported"
        } else if no_render_entropy {
            "no canvas/webgl/audio entropy reported"
        } else {
            "no plugins or fonts reported"
        };
        let delta = if no_render_entropy && no_plugins_or_fonts { 0.7 } else { 0.4 };

        state.sink.raise(SignalKey::new("client.headless_signal"), true, self.name());
        vec![DetectionContribution::new(self.name(), DetectorClass::ClientSide)
            .with_delta(delta)
            .with_weight(3.0)
            .with_bot_type(BotType::Generic)
            .with_reason(reason)]
    }
}

impl Default for ClientFingerprintDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_detect_detector::{ClientFingerprint, NullCoordinatorQuery, RequestSnapshot};
    use bot_detect_signal::SignalSink;
    use std::net::IpAddr;

    fn snapshot(fp: Option<ClientFingerprint>) -> RequestSnapshot {
        RequestSnapshot {
            request_id: "r1".into(),
            path: "/".into(),
            method: "GET".into(),
            ip: "1.2.3.4".parse::<IpAddr>().unwrap(),
            user_agent: "Mozilla/5.0".into(),
            headers: Default::default(),
            received_at: chrono::Utc::now(),
            is_websocket_upgrade: false,
            client_fingerprint: fp,
        }
    }

    #[tokio::test]
    async fn missing_fingerprint_is_no_signal() {
        let detector = ClientFingerprintDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = NullCoordinatorQuery;
        let request = snapshot(None);
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        assert!(detector.contribute(&detector_state).await.is_empty());
    }

    #[tokio::test]
    async fn blank_fingerprint_is_flagged() {
        let detector = ClientFingerprintDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = NullCoordinatorQuery;
        let request = snapshot(Some(ClientFingerprint::default()));
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        let contributions = detector.contribute(&detector_state).await;
        assert_eq!(contributions.len(), 1);
        assert!(contributions[0].confidence_delta > 0.6);
    }

    #[tokio::test]
    async fn rich_fingerprint_is_no_signal() {
        let detector = ClientFingerprintDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = NullCoordinatorQuery;
        let mut fp = ClientFingerprint::default();
        fp.canvas_hash = Some("abc".into());
        fp.plugins = vec!["PDF Viewer".into()];
        fp.fonts = vec!["Arial".into()];
        let request = snapshot(Some(fp));
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        assert!(detector.contribute(&detector_state).await.is_empty());
    }
}
