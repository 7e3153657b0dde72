use chrono::{DateTime, Utc};

use crate::key::SignalKey;
use crate::payload::SignalPayload;

/// One fact raised by one detector at one point in time. Payloads are
/// immutable once raised — later code must raise a new entry rather than
/// mutate this one.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignalEntry {
    pub key: SignalKey,
    pub payload: SignalPayload,
    pub timestamp: DateTime<Utc>,
    pub detector: String,
    pub confidence: Option<f64>,
    pub weight: Option<f64>,
    /// Monotonic append order within the owning sink. Used to break ties
    /// when two entries share a timestamp and to implement "newest
    /// first" without resorting to a wall-clock sort, which can be
    /// ambiguous at sub-millisecond resolution under concurrent Raise.
    pub(crate) seq: u64,
}

impl SignalEntry {
    pub fn new(key: SignalKey, payload: SignalPayload, detector: impl Into<String>) -> Self {
        Self {
            key,
            payload,
            timestamp: Utc::now(),
            detector: detector.into(),
            confidence: None,
            weight: None,
            seq: 0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}
