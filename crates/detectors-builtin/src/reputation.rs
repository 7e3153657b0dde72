use std::sync::Arc;

use async_trait::async_trait;
use bot_detect_detector::{BotType, Detector, DetectionContribution, DetectorClass, DetectorState};
use bot_detect_reputation::{FastPathVerdict, ReputationCache};
use bot_detect_signal::{SignalKey, SignalPattern};

/// Wave 0 consumer of [`ReputationCache`]. A confirmed/manual pattern
/// with enough support can instant-block; a confirmed/manual *good*
/// pattern contributes a strong, but not early-exiting, human vote —
/// `VerifiedGood` stays reserved for cryptographic verification so a
/// spoofed UA can't borrow another pattern's trust.
pub struct ReputationDetector {
    cache: Arc<ReputationCache>,
    emitted: Vec<SignalKey>,
}

impl ReputationDetector {
    pub fn new(cache: Arc<ReputationCache>) -> Self {
        Self { cache, emitted: vec![SignalKey::new("reputation.verdict")] }
    }

    fn pattern_id(state: &DetectorState<'_>) -> String {
        format!("ip:{}", state.request.ip)
    }
}

#[async_trait]
impl Detector for ReputationDetector {
    fn name(&self) -> &str {
        "reputation_fastpath"
    }
    fn wave(&self) -> u32 {
        0
    }
    fn priority(&self) -> i32 {
        20
    }
    fn triggers(&self) -> &[SignalPattern] {
        &[]
    }
    fn emitted(&self) -> &[SignalKey] {
        &self.emitted
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution> {
        let pattern_id = Self::pattern_id(state);
        match self.cache.fastpath_verdict(&pattern_id) {
            FastPathVerdict::InstantBlock { bot_score, support } => {
                state.sink.raise(SignalKey::new("reputation.verdict"), "confirmed_bad", self.name());
                vec![DetectionContribution::new(self.name(), DetectorClass::Ip)
                    .with_bot_type(BotType::MaliciousBot)
                    .with_reason(format!("ip has confirmed-bad reputation (support={support:.1}, score={bot_score:.2})"))
                    .verified_bad()]
            }
            FastPathVerdict::StrongHuman { support } => {
                state.sink.raise(SignalKey::new("reputation.verdict"), "confirmed_good", self.name());
                vec![DetectionContribution::new(self.name(), DetectorClass::Ip)
                    .with_delta(-0.9)
                    .with_weight(6.0)
                    .with_reason(format!("ip has confirmed-good reputation (support={support:.1})"))]
            }
            FastPathVerdict::None => Vec::new(),
        }
    }
}

/// Wave 1 consumer: softer contribution for non-confirmed reputation
/// states, scaled by accumulated support.
pub struct ReputationBiasDetector {
    cache: Arc<ReputationCache>,
    emitted: Vec<SignalKey>,
}

impl ReputationBiasDetector {
    pub fn new(cache: Arc<ReputationCache>) -> Self {
        Self { cache, emitted: Vec::new() }
    }
}

#[async_trait]
impl Detector for ReputationBiasDetector {
    fn name(&self) -> &str {
        "reputation_bias"
    }
    fn wave(&self) -> u32 {
        1
    }
    fn priority(&self) -> i32 {
        50
    }
    fn triggers(&self) -> &[SignalPattern] {
        &[]
    }
    fn emitted(&self) -> &[SignalKey] {
        &self.emitted
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution> {
        let pattern_id = ReputationDetector::pattern_id(state);
        let Some((delta, scale)) = self.cache.bias_contribution(&pattern_id) else { return Vec::new() };
        vec![DetectionContribution::new(self.name(), DetectorClass::Ip)
            .with_delta(delta)
            .with_weight(2.0 * scale)
            .with_reason("ip reputation trending")]
    }
}
