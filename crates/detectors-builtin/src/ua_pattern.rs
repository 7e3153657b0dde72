use async_trait::async_trait;
use bot_detect_detector::{BotType, Detector, DetectionContribution, DetectorClass, DetectorState};
use bot_detect_signal::{SignalKey, SignalPattern};
use regex::Regex;

/// Known scraper/crawler/tooling user agents, regex-matched the way the
/// source system's UA rule table is described — a flat list of
/// patterns, each tagged with the bot type it implies.
pub struct UaPatternDetector {
    rules: Vec<(Regex, BotType, &'static str)>,
    emitted: Vec<SignalKey>,
}

impl UaPatternDetector {
    pub fn new() -> Self {
        let rules = vec![
            (Regex::new(r"(?i)python-requests|python-urllib|scrapy|curl/|wget/").unwrap(), BotType::Scraper, "generic_http_client"),
            (Regex::new(r"(?i)googlebot|bingbot|duckduckbot|baiduspider|yandexbot").unwrap(), BotType::SearchEngine, "search_engine_crawler"),
            (Regex::new(r"(?i)facebookexternalhit|twitterbot|slackbot|discordbot|whatsapp").unwrap(), BotType::SocialMedia, "social_preview_fetcher"),
            (Regex::new(r"(?i)gptbot|claudebot|anthropic-ai|ccbot|bytespider").unwrap(), BotType::AiBot, "ai_training_crawler"),
            (Regex::new(r"(?i)pingdom|uptimerobot|statuscake|newrelic|datadog").unwrap(), BotType::Monitoring, "uptime_monitor"),
        ];
        Self { rules, emitted: vec![SignalKey::new("ua.category")] }
    }
}

#[async_trait]
impl Detector for UaPatternDetector {
    fn name(&self) -> &str {
        "ua_pattern"
    }
    fn wave(&self) -> u32 {
        0
    }
    fn priority(&self) -> i32 {
        10
    }
    fn triggers(&self) -> &[SignalPattern] {
        &[]
    }
    fn emitted(&self) -> &[SignalKey] {
        &self.emitted
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution> {
        let ua = &state.request.user_agent;
        for (re, bot_type, reason) in &self.rules {
            if re.is_match(ua) {
                state.sink.raise(SignalKey::new("ua.category"), reason.to_string(), self.name());
                let delta = if *bot_type == BotType::Scraper { 0.85 } else { 0.55 };
                return vec![DetectionContribution::new(self.name(), DetectorClass::Ua)
                    .with_delta(delta)
                    .with_weight(3.0)
                    .with_bot_type(*bot_type)
                    .with_reason(format!("user agent matched {reason}"))];
            }
        }
        Vec::new()
    }
}

impl Default for UaPatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_detect_detector::{NullCoordinatorQuery, RequestSnapshot};
    use bot_detect_signal::SignalSink;
    use std::net::IpAddr;

    fn snapshot(ua: &str) -> RequestSnapshot {
        RequestSnapshot {
            request_id: "r1".into(),
            path: "/".into(),
            method: "GET".into(),
            ip: "1.2.3.4".parse::<IpAddr>().unwrap(),
            user_agent: ua.to_string(),
            headers: Default::default(),
            received_at: chrono::Utc::now(),
            is_websocket_upgrade: false,
            client_fingerprint: None,
        }
    }

    #[tokio::test]
    async fn python_requests_is_flagged_scraper() {
        let detector = UaPatternDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = NullCoordinatorQuery;
        let request = snapshot("python-requests/2.28.1");
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        let contributions = detector.contribute(&detector_state).await;
        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].bot_type, BotType::Scraper);
    }

    #[tokio::test]
    async fn ordinary_browser_ua_contributes_nothing() {
        let detector = UaPatternDetector::new();
        let sink = SignalSink::operation_scoped();
        let coordinator = NullCoordinatorQuery;
        let request = snapshot("Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/124.0");
        let detector_state = DetectorState { sink: &sink, request: &request, signature: "sig", coordinator: &coordinator };
        assert!(detector.contribute(&detector_state).await.is_empty());
    }
}
