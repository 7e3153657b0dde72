use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

/// Non-human classification. Ordered roughly by specificity — the
/// aggregator breaks ties on this order when two contributions carry
/// equal weight (`MaliciousBot` > `Scraper` > `AiBot` > `SearchEngine` >
/// `SocialMedia` > `Monitoring` > `Generic`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum BotType {
    Human,
    Generic,
    Monitoring,
    SocialMedia,
    SearchEngine,
    AiBot,
    Scraper,
    MaliciousBot,
}

impl BotType {
    /// Specificity rank used for tie-breaking, highest wins.
    pub fn specificity(self) -> u8 {
        match self {
            BotType::Human => 0,
            BotType::Generic => 1,
            BotType::Monitoring => 2,
            BotType::SocialMedia => 3,
            BotType::SearchEngine => 4,
            BotType::AiBot => 5,
            BotType::Scraper => 6,
            BotType::MaliciousBot => 7,
        }
    }
}

/// Which class of evidence a detector draws on. Used by the aggregator's
/// confidence-coverage cap (§4.5) — confidence cannot run away on the
/// strength of a single evidence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DetectorClass {
    Ua,
    Header,
    Ip,
    Behavioral,
    ClientSide,
    Heuristic,
}

/// Whether a contribution is an ordinary signed vote or a cryptographic /
/// administrative verification that forces the final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
pub enum Verified {
    #[default]
    No,
    VerifiedBad,
    VerifiedGood,
}

/// One detector's signed, weighted vote toward bot probability.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetectionContribution {
    pub detector_name: String,
    pub category: DetectorClass,
    /// In [-1, +1], positive is bot-ward.
    pub confidence_delta: f64,
    pub weight: f64,
    pub reason: String,
    pub bot_type: BotType,
    pub trigger_early_exit: bool,
    pub verified: Verified,
    pub emitted_signals: BTreeMap<String, String>,
}

impl DetectionContribution {
    pub fn new(detector_name: impl Into<String>, category: DetectorClass) -> Self {
        Self {
            detector_name: detector_name.into(),
            category,
            confidence_delta: 0.0,
            weight: 1.0,
            reason: String::new(),
            bot_type: BotType::Generic,
            trigger_early_exit: false,
            verified: Verified::No,
            emitted_signals: BTreeMap::new(),
        }
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.confidence_delta = delta.clamp(-1.0, 1.0);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_bot_type(mut self, bot_type: BotType) -> Self {
        self.bot_type = bot_type;
        self
    }

    pub fn with_early_exit(mut self) -> Self {
        self.trigger_early_exit = true;
        self
    }

    pub fn verified_bad(mut self) -> Self {
        self.verified = Verified::VerifiedBad;
        self.trigger_early_exit = true;
        self
    }

    pub fn verified_good(mut self) -> Self {
        self.verified = Verified::VerifiedGood;
        self
    }
}

/// Immutable snapshot of the inbound request, seeded into the operation
/// sink at creation and handed to every detector unchanged. Detectors
/// never mutate each other or the request; communication is strictly
/// through signals.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RequestSnapshot {
    pub request_id: String,
    pub path: String,
    pub method: String,
    pub ip: IpAddr,
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
    pub received_at: DateTime<Utc>,
    pub is_websocket_upgrade: bool,
    pub client_fingerprint: Option<ClientFingerprint>,
}

/// Client-side factors posted asynchronously after first contact via
/// `/api/v1/bot-detection/client-fingerprint`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ClientFingerprint {
    pub canvas_hash: Option<String>,
    pub webgl_hash: Option<String>,
    pub audio_hash: Option<String>,
    pub plugins: Vec<String>,
    pub fonts: Vec<String>,
}
