use async_trait::async_trait;
use bot_detect_detector::{BotType, Detector, DetectionContribution, DetectorClass, DetectorState};
use bot_detect_signal::{SignalKey, SignalPattern};
use regex::Regex;

/// User agents belonging to security scanners / exploitation tooling.
/// A match is cryptographically-certain-grade evidence in practice (no
/// legitimate browser ships these strings), so it verifies bad and
/// short-circuits the rest of the waves.
pub struct SecurityToolUaDetector {
    pattern: Regex,
    emitted: Vec<SignalKey>,
}

impl SecurityToolUaDetector {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)nmap|sqlmap|nikto|masscan|nuclei|dirbuster|gobuster|metasploit|burpsuite|acunetix|openvas")
                .unwrap(),
            emitted: vec![SignalKey::new("ua.security_tool")],
        }
    }
}

#[async_trait]
impl Detector for SecurityToolUaDetector {
    fn name(&self) -> &str {
        "security_tool_ua"
    }
    fn wave(&self) -> u32 {
        0
    }
    fn priority(&self) -> i32 {
        5
    }
    fn triggers(&self) -> &[SignalPattern] {
        &[]
    }
    fn emitted(&self) -> &[SignalKey] {
        &self.emitted
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution> {
        if !self.pattern.is_match(&state.request.user_agent) {
            return Vec::new();
        }
        state.sink.raise(SignalKey::new("ua.security_tool"), true, self.name());
        vec![DetectionContribution::new(self.name(), DetectorClass::Ua)
            .with_bot_type(BotType::MaliciousBot)
            .with_reason("user agent identifies a security scanning tool")
            .verified_bad()]
    }
}

impl Default for SecurityToolUaDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_detect_detector::{NullCoordinatorQuery, RequestSnapshot, Verified};
    use bot_detect_signal::SignalSink;
    use std::net::IpAddr;

    #[tokio::test]
    async fn nmap_user_agent_is_verified_bad() {
        let detector = SecurityToolUaDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = NullCoordinatorQuery;
        let request = RequestSnapshot {
            request_id: "r1".into(),
            path: "/".into(),
            method: "GET".into(),
            ip: "1.2.3.4".parse::<IpAddr>().unwrap(),
            user_agent: "Mozilla/5.0 (compatible; Nmap Scripting Engine; https://nmap.org/book/nse.html)".into(),
            headers: Default::default(),
            received_at: chrono::Utc::now(),
            is_websocket_upgrade: false,
            client_fingerprint: None,
        };
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        let contributions = detector.contribute(&detector_state).await;
        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].verified, Verified::VerifiedBad);
    }
}
