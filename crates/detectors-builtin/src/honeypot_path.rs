use async_trait::async_trait;
use bot_detect_detector::{BotType, Detector, DetectionContribution, DetectorClass, DetectorState};
use bot_detect_signal::{SignalKey, SignalPattern};

/// Paths that serve no legitimate purpose — hitting one is a strong,
/// near-certain bot signal. Exact-match against a small static list,
/// the way the source's honeypot table is a flat set of deliberately
/// exposed endpoints.
pub struct HoneypotPathDetector {
    paths: Vec<&'static str>,
    emitted: Vec<SignalKey>,
}

impl HoneypotPathDetector {
    pub fn new() -> Self {
        Self {
            paths: vec![
                "/.git/config",
                "/.env",
                "/wp-admin/admin-ajax.php",
                "/.aws/credentials",
                "/phpmyadmin/index.php",
                "/.ssh/id_rsa",
            ],
            emitted: vec![SignalKey::new("request.honeypot_hit")],
        }
    }

    pub fn is_honeypot(&self, path: &str) -> bool {
        self.paths.iter().any(|p| *p == path)
    }
}

#[async_trait]
impl Detector for HoneypotPathDetector {
    fn name(&self) -> &str {
        "honeypot_path"
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
        &self.emitted
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution> {
        if !self.is_honeypot(&state.request.path) {
            return Vec::new();
        }
        state.sink.raise(SignalKey::new("request.honeypot_hit"), true, self.name());
        vec![DetectionContribution::new(self.name(), DetectorClass::Header)
            .with_delta(0.97)
            .with_weight(8.0)
            .with_bot_type(BotType::MaliciousBot)
            .with_reason(format!("honeypot path {} accessed", state.request.path))]
    }
}

impl Default for HoneypotPathDetector {
    fn default() -> Self {
        Self::new()
    }
}
