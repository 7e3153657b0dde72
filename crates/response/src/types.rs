use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResponseMode {
    Blocking,
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Thoroughness {
    Standard,
    Deep,
}

/// Decided in Wave 0 from early signals (e.g. a honeypot-path hit
/// forces `Blocking`/`Deep`) and carried for the life of the operation.
#[derive(Debug, Clone, Copy)]
pub struct ResponseAnalysisContext {
    pub mode: ResponseMode,
    pub thoroughness: Thoroughness,
}

impl ResponseAnalysisContext {
    pub fn standard_async() -> Self {
        Self { mode: ResponseMode::Async, thoroughness: Thoroughness::Standard }
    }

    pub fn blocking_deep() -> Self {
        Self { mode: ResponseMode::Blocking, thoroughness: Thoroughness::Deep }
    }
}

/// What a `Blocking`-mode analysis may do to the outgoing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResponseAction {
    Allow,
    MaskPii,
    ReplaceWithHoneypot,
    Block,
}

pub const MAX_BUFFER_BYTES: usize = 64 * 1024;
pub const MAX_BLOCKING_DURATION: Duration = Duration::from_millis(20);

/// What the coordinator hands the orchestrator once an operation
/// finishes — the payload raised onto the global sink and handed to
/// any caller waiting on the detection result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OperationSummary {
    pub signature: String,
    pub bot_probability: f64,
    pub confidence: f64,
    pub action: bot_detect_aggregator::RecommendedAction,
    pub response_action: ResponseAction,
    pub cluster_id: Option<u64>,
}
