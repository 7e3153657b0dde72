use std::time::Duration;

use async_trait::async_trait;
use bot_detect_signal::{SignalKey, SignalPattern, SignalSink};

use crate::types::{DetectionContribution, RequestSnapshot};

/// Read-only cross-request query surface a detector may consult (never
/// mutate) during a single call. Implemented by the signature
/// coordinator crate; kept as a trait here so `bot-detect-detector` does
/// not need to depend on it and create a dependency cycle.
pub trait CoordinatorQuery: Send + Sync {
    /// Current behavior snapshot for a signature, if one exists yet.
    fn path_entropy(&self, signature: &str) -> Option<f64>;
    fn timing_cv(&self, signature: &str) -> Option<f64>;
    fn avg_bot_probability(&self, signature: &str) -> Option<f64>;
    fn is_aberrant(&self, signature: &str) -> bool;
    fn request_count_in_window(&self, signature: &str) -> usize;
}

/// No-op implementation used before the coordinator has observed any
/// traffic (e.g. in unit tests), per §9's "pluggable interfaces with
/// no-op implementations" note.
pub struct NullCoordinatorQuery;

impl CoordinatorQuery for NullCoordinatorQuery {
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
        0
    }
}

/// Everything a detector's `contribute` call is handed: the operation
/// sink (read/write), the immutable request snapshot, the signature for
/// this request, and read-only access to the cross-request coordinator.
pub struct DetectorState<'a> {
    pub sink: &'a SignalSink,
    pub request: &'a RequestSnapshot,
    pub signature: &'a str,
    pub coordinator: &'a dyn CoordinatorQuery,
}

/// The fixed, small method set every leaf detector implements. No
/// inheritance hierarchy beyond this — dynamic dispatch over "which
/// detectors contribute" is expressed as `Vec<Arc<dyn Detector>>`.
#[async_trait]
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;
    fn wave(&self) -> u32;
    fn priority(&self) -> i32;
    /// Signal patterns that must all have at least one match before this
    /// detector activates in wave > 0. Ignored for wave 0.
    fn triggers(&self) -> &[SignalPattern];
    fn emitted(&self) -> &[SignalKey];
    fn timeout(&self) -> Duration {
        Duration::from_millis(5)
    }

    async fn contribute(&self, state: &DetectorState<'_>) -> Vec<DetectionContribution>;
}
