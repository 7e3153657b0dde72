use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A tagged union covering every shape a detector raises. Per the
/// redesign notes, the source's dynamically-typed payloads collapse into
/// a small, closed set of shapes; unknown consumers are expected to
/// tolerate a shape they don't recognise rather than panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SignalPayload {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A named enum-like variant, e.g. `BotType::Scraper`.
    Variant(String),
    /// A small flat record. Not meant for arbitrarily nested structures —
    /// detectors that need more should raise multiple keys instead.
    Record(BTreeMap<String, SignalPayload>),
}

impl SignalPayload {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SignalPayload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalPayload::Float(f) => Some(*f),
            SignalPayload::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SignalPayload::Int(i) => Some(*i),
            SignalPayload::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SignalPayload::Text(s) => Some(s.as_str()),
            SignalPayload::Variant(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerces to bool, silently defaulting to `false` for any shape that
    /// isn't a bool rather than erroring. This is what "invalid payloads
    /// are silently coerced to nil" looks like from the read side.
    pub fn coerce_bool(&self) -> bool {
        self.as_bool().unwrap_or(false)
    }

    pub fn coerce_f64(&self, default: f64) -> f64 {
        self.as_f64().unwrap_or(default)
    }
}

impl From<bool> for SignalPayload {
    fn from(b: bool) -> Self {
        SignalPayload::Bool(b)
    }
}

impl From<i64> for SignalPayload {
    fn from(i: i64) -> Self {
        SignalPayload::Int(i)
    }
}

impl From<f64> for SignalPayload {
    fn from(f: f64) -> Self {
        SignalPayload::Float(f)
    }
}

impl From<&str> for SignalPayload {
    fn from(s: &str) -> Self {
        SignalPayload::Text(s.to_string())
    }
}

impl From<String> for SignalPayload {
    fn from(s: String) -> Self {
        SignalPayload::Text(s)
    }
}
