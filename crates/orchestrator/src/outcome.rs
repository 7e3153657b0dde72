use std::sync::Arc;

use bot_detect_aggregator::Verdict;
use bot_detect_identity::Signature;
use bot_detect_response::ResponseAnalysisContext;
use bot_detect_signal::SignalSink;

/// Everything a caller needs after `BlackboardOrchestrator::detect`
/// returns: the verdict itself, plus enough context to drive the
/// response-analysis and post-response bookkeeping passes without
/// recomputing the signature or re-resolving the policy.
pub struct DetectionOutcome {
    pub verdict: Verdict,
    pub signature: Signature,
    /// The reputation cache's key for this request's source IP — a
    /// separate namespace from `signature` (ip+ua), since reputation
    /// tracks the raw IP regardless of which user agent shows up with it.
    pub reputation_pattern_id: String,
    pub policy_name: String,
    pub response_context: ResponseAnalysisContext,
    pub operation_sink: Arc<SignalSink>,
    pub cluster_id: Option<u64>,
    /// The originating request's id, carried through so
    /// `BlackboardOrchestrator::record_outcome` can dedupe the
    /// coordinator's behavior window by request rather than by chance.
    pub request_id: String,
}

impl DetectionOutcome {
    /// The §5 cancellation-path outcome: a neutral/log-only verdict with
    /// whatever sink state had accumulated before cancellation, handed
    /// back rather than blocking the caller further.
    pub fn cancelled(
        signature: Signature,
        reputation_pattern_id: String,
        policy_name: String,
        operation_sink: Arc<SignalSink>,
        request_id: String,
    ) -> Self {
        Self {
            verdict: Verdict::cancelled(),
            signature,
            reputation_pattern_id,
            policy_name,
            response_context: ResponseAnalysisContext::standard_async(),
            operation_sink,
            cluster_id: None,
            request_id,
        }
    }
}
