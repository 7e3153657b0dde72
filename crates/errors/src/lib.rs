//! Error kinds per §7 of the detection engine design.
//!
//! Core code never throws across its public contracts. Every failure that
//! can happen on the request path is one of the non-fatal variants below
//! and is turned into a signal/counter by the caller instead of aborting
//! the verdict. `PolicyConfigError` is the only startup-fatal kind — it is
//! returned from config/policy loading, never from the hot path.

use thiserror::Error;

/// A leaf detector failed or exceeded its per-call timeout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("detector '{detector}' failed: {reason}")]
pub struct DetectorError {
    pub detector: String,
    pub reason: String,
}

impl DetectorError {
    pub fn new(detector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { detector: detector.into(), reason: reason.into() }
    }

    pub fn timeout(detector: impl Into<String>) -> Self {
        Self::new(detector, "timed out")
    }
}

/// A sink was at capacity and dropped its oldest entry.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("sink overflow: capacity {capacity} reached, oldest entry dropped")]
pub struct SinkOverflow {
    pub capacity: usize,
}

/// The signature coordinator's keyed queue was saturated for a given key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("coordinator backpressure for signature {signature}: oldest pending update dropped")]
pub struct CoordinatorBackpressure {
    pub signature: String,
}

/// Startup-fatal: a policy referenced a detector or transition that cannot
/// be resolved. The engine refuses to start rather than run with a policy
/// it cannot honor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyConfigError {
    #[error("policy '{policy}' references unknown required detector '{detector}'")]
    UnknownRequiredDetector { policy: String, detector: String },
    #[error("policy '{policy}' has a syntactically invalid transition: {reason}")]
    InvalidTransition { policy: String, reason: String },
    #[error("no policy named 'default' is registered")]
    MissingDefaultPolicy,
}

/// The request was cancelled by the host before a verdict could be formed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cancellation requested")]
pub struct CancellationRequested;

/// An attempt was made to demote a manually-set reputation state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rejected attempt to demote manual reputation state for pattern '{pattern_id}'")]
pub struct ReputationStateViolation {
    pub pattern_id: String,
}

/// Umbrella for the non-fatal kinds, so a single counter-increment call
/// site can accept any of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    SinkOverflow(#[from] SinkOverflow),
    #[error(transparent)]
    CoordinatorBackpressure(#[from] CoordinatorBackpressure),
    #[error(transparent)]
    Cancellation(#[from] CancellationRequested),
    #[error(transparent)]
    ReputationViolation(#[from] ReputationStateViolation),
}
