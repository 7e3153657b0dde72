use std::sync::Arc;

use bot_detect_aggregator::Verdict;
use bot_detect_signal::{SignalKey, SignalPayload, SignalSink};

use crate::pii::mask;
use crate::types::{OperationSummary, ResponseAction, ResponseAnalysisContext, ResponseMode, Thoroughness, MAX_BLOCKING_DURATION};

/// What the handler produced, bounded to what's safe/cheap to inspect.
pub struct ResponseInput<'a> {
    pub status: u16,
    pub headers: &'a [(String, String)],
    pub body_prefix: &'a [u8],
    pub is_honeypot_path: bool,
}

/// Analyses and, in `Blocking` mode, potentially rewrites the outgoing
/// response; in both modes raises `response.*` signals and eventually
/// composes the operation's final summary.
pub struct ResponseDetectionCoordinator;

impl ResponseDetectionCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Bounded synchronous analysis within `MaxBlockingDurationMs`.
    /// Falls back to `Allow` if the deadline is somehow exceeded, since
    /// holding up the response is worse than missing one masking pass.
    pub async fn analyze_blocking(
        &self,
        ctx: &ResponseAnalysisContext,
        input: &ResponseInput<'_>,
        sink: &SignalSink,
    ) -> ResponseAction {
        debug_assert_eq!(ctx.mode, ResponseMode::Blocking);
        match tokio::time::timeout(MAX_BLOCKING_DURATION, async { self.analyze(ctx, input, sink) }).await {
            Ok(action) => action,
            Err(_) => {
                tracing::warn!("blocking response analysis exceeded its deadline, defaulting to allow");
                ResponseAction::Allow
            }
        }
    }

    /// Fire-and-forget analysis: emits signals into the operation sink
    /// before it closes but never affects the response already sent.
    pub fn analyze_async(self: Arc<Self>, ctx: ResponseAnalysisContext, status: u16, body_prefix: Vec<u8>, is_honeypot_path: bool, sink: Arc<SignalSink>) {
        tokio::spawn(async move {
            let input = ResponseInput { status, headers: &[], body_prefix: &body_prefix, is_honeypot_path };
            self.analyze(&ctx, &input, &sink);
        });
    }

    fn analyze(&self, ctx: &ResponseAnalysisContext, input: &ResponseInput<'_>, sink: &SignalSink) -> ResponseAction {
        sink.raise(SignalKey::new("response.status"), input.status as i64, "response_coordinator");

        if input.is_honeypot_path {
            sink.raise(SignalKey::new("response.pattern"), "honeypot_path", "response_coordinator");
            return ResponseAction::ReplaceWithHoneypot;
        }

        if input.status >= 500 {
            sink.raise(SignalKey::new("response.pattern"), "server_error", "response_coordinator");
            sink.raise(SignalKey::new("response.score"), 0.6f64, "response_coordinator");
        }

        if matches!(ctx.thoroughness, Thoroughness::Deep) {
            if let Ok(text) = std::str::from_utf8(input.body_prefix) {
                let (_, fired) = mask(text);
                for category in &fired {
                    sink.raise(
                        SignalKey::new(format!("response.pii_masking.{category}")),
                        true,
                        "response_coordinator",
                    );
                }
                if !fired.is_empty() {
                    return ResponseAction::MaskPii;
                }
            }
        }

        ResponseAction::Allow
    }

    /// Composes the final `OperationSummary`, raises it keyed by
    /// signature onto the global sink, then drops the operation sink —
    /// its last `Arc` reference goes with it, so nothing keeps the
    /// per-request signal scope alive past this point.
    pub fn compose_operation_summary(
        &self,
        signature: &str,
        verdict: &Verdict,
        response_action: ResponseAction,
        cluster_id: Option<u64>,
        global_sink: &SignalSink,
        operation_sink: Arc<SignalSink>,
    ) -> OperationSummary {
        let summary = OperationSummary {
            signature: signature.to_string(),
            bot_probability: verdict.bot_probability,
            confidence: verdict.confidence,
            action: verdict.action,
            response_action,
            cluster_id,
        };

        let mut record = std::collections::BTreeMap::new();
        record.insert("bot_probability".to_string(), SignalPayload::Float(summary.bot_probability));
        record.insert("confidence".to_string(), SignalPayload::Float(summary.confidence));
        global_sink.raise(
            SignalKey::new(format!("operation.complete.{signature}")),
            SignalPayload::Record(record),
            "response_coordinator",
        );

        drop(operation_sink);
        summary
    }
}

impl Default for ResponseDetectionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseAnalysisContext;

    #[tokio::test]
    async fn honeypot_path_replaces_response() {
        let coordinator = ResponseDetectionCoordinator::new();
        let sink = SignalSink::operation_scoped();
        let ctx = ResponseAnalysisContext::blocking_deep();
        let input = ResponseInput { status: 200, headers: &[], body_prefix: b"hello", is_honeypot_path: true };
        let action = coordinator.analyze_blocking(&ctx, &input, &sink).await;
        assert_eq!(action, ResponseAction::ReplaceWithHoneypot);
    }

    #[tokio::test]
    async fn pii_in_deep_mode_triggers_masking() {
        let coordinator = ResponseDetectionCoordinator::new();
        let sink = SignalSink::operation_scoped();
        let ctx = ResponseAnalysisContext::blocking_deep();
        let input = ResponseInput { status: 200, headers: &[], body_prefix: b"email me at a@b.com", is_honeypot_path: false };
        let action = coordinator.analyze_blocking(&ctx, &input, &sink).await;
        assert_eq!(action, ResponseAction::MaskPii);
        assert!(sink.has_match("response.pii_masking.*"));
    }

    #[tokio::test]
    async fn clean_standard_response_is_allowed() {
        let coordinator = ResponseDetectionCoordinator::new();
        let sink = SignalSink::operation_scoped();
        let ctx = ResponseAnalysisContext::standard_async();
        let input = ResponseInput { status: 200, headers: &[], body_prefix: b"ok", is_honeypot_path: false };
        let action = coordinator.analyze_blocking(&ctx, &input, &sink).await;
        assert_eq!(action, ResponseAction::Allow);
    }
}
