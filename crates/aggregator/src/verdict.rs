use bot_detect_detector::BotType;

/// VeryLow (<0.2), Low (<0.35), Elevated (<0.5), Medium (<0.65),
/// High (<0.8), VeryHigh (>=0.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum RiskBand {
    VeryLow,
    Low,
    Elevated,
    Medium,
    High,
    VeryHigh,
}

impl RiskBand {
    pub fn from_probability(p: f64) -> Self {
        if p < 0.2 {
            RiskBand::VeryLow
        } else if p < 0.35 {
            RiskBand::Low
        } else if p < 0.5 {
            RiskBand::Elevated
        } else if p < 0.65 {
            RiskBand::Medium
        } else if p < 0.8 {
            RiskBand::High
        } else {
            RiskBand::VeryHigh
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RecommendedAction {
    Allow,
    LogOnly,
    Challenge,
    Throttle,
    Block,
    MaskResponse,
}

/// The final, per-request output of the engine: everything a handler or
/// the response-header layer needs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Verdict {
    pub bot_probability: f64,
    pub confidence: f64,
    pub risk_band: RiskBand,
    pub action: RecommendedAction,
    pub bot_type: BotType,
    pub bot_name: Option<String>,
    /// Top reasons, newest/highest-weight first, capped at 5 for the
    /// `X-Bot-Detection-Reasons` header.
    pub reasons: Vec<String>,
    pub timed_out: bool,
}

impl Verdict {
    /// The "no contributions" / cancellation edge case: confidence 0,
    /// probability 0.5, allow.
    pub fn neutral() -> Self {
        Self {
            bot_probability: 0.5,
            confidence: 0.0,
            risk_band: RiskBand::from_probability(0.5),
            action: RecommendedAction::Allow,
            bot_type: BotType::Human,
            bot_name: None,
            reasons: Vec::new(),
            timed_out: false,
        }
    }

    /// The cancellation-path verdict from §5: `action=LogOnly,
    /// botProbability=0.5, confidence=0`.
    pub fn cancelled() -> Self {
        Self { action: RecommendedAction::LogOnly, ..Self::neutral() }
    }
}
