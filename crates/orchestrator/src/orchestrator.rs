use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bot_detect_aggregator::{AggregationConfig, ContributionAggregator, RecommendedAction, RiskBand, Verdict};
use bot_detect_detector::{
    CoordinatorQuery, Detector, DetectorManifest, DetectorState, DetectionContribution, RequestSnapshot, Verified,
};
use bot_detect_fastpath::IdentityInputs;
use bot_detect_policy::{EvalContext, Policy, TransitionAction};
use bot_detect_response::{ResponseAction, ResponseAnalysisContext, ResponseInput, ResponseMode};
use bot_detect_signal::{SignalKey, SignalSink};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::outcome::DetectionOutcome;
use crate::services::EngineServices;
use crate::subnet::subnet_string;

/// Runs the wave-based blackboard algorithm: a Wave 0 pass every
/// request takes, then later waves only for detectors whose triggers
/// have already fired, evaluating the resolved policy's transitions
/// after each wave and exiting the moment a terminal action or an
/// early-exit verification settles the verdict.
pub struct BlackboardOrchestrator {
    services: Arc<EngineServices>,
}

impl BlackboardOrchestrator {
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }

    pub async fn detect(&self, request: RequestSnapshot) -> DetectionOutcome {
        self.detect_with_cancellation(request, None).await
    }

    /// Same algorithm, checked for cancellation at each wave boundary.
    /// `cancelled` is a caller-owned flag (e.g. set when the client
    /// disconnects) — cooperative, not preemptive, per §5.
    pub async fn detect_with_cancellation(
        &self,
        request: RequestSnapshot,
        cancelled: Option<&AtomicBool>,
    ) -> DetectionOutcome {
        let signature = self.services.identity_salt.hash(&[&request.ip.to_string(), &request.user_agent]);
        let request_id = request.request_id.clone();
        let operation_sink = Arc::new(SignalSink::operation_scoped());
        let policy = self.services.policies.resolve(&request.path).clone();

        let reputation_pattern_id = format!("ip:{}", request.ip);
        let reputation_state = self.services.reputation.query(&reputation_pattern_id).map(|p| p.state);
        let reputation_state_name = reputation_state.map(|s| format!("{s:?}"));

        self.run_fastpath_check(&request, &operation_sink);

        let coordinator_query: &dyn CoordinatorQuery = self.services.coordinator.as_ref();
        let deadline = Instant::now() + policy.timeout_budget;
        let parallelism = policy.parallelism.min(self.services.max_parallelism.max(1));

        let mut contributions: Vec<DetectionContribution> = Vec::new();
        let mut verdict = Verdict::neutral();
        let mut terminal_action: Option<TransitionAction> = None;

        let main_path_names: Vec<String> =
            policy.fast_path.iter().cloned().chain(policy.slow_path.iter().cloned()).collect();
        let waves = Self::group_by_wave(self.services.detectors.detectors_for(&main_path_names));

        'waves: for (_wave_num, wave_detectors) in waves {
            if cancelled.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false) {
                return DetectionOutcome::cancelled(signature, reputation_pattern_id, policy.name, operation_sink, request_id);
            }

            let runnable: Vec<(DetectorManifest, Arc<dyn Detector>)> = wave_detectors
                .into_iter()
                .filter(|(manifest, _)| {
                    manifest.triggers.iter().all(|t| operation_sink.has_match(t.clone()))
                })
                .collect();
            if runnable.is_empty() {
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(policy = %policy.name, "detection timeout budget exhausted mid-wave");
                break;
            }

            let wave_contributions = self
                .run_wave(&runnable, &operation_sink, &request, &signature, coordinator_query, parallelism, remaining)
                .await;

            let early_exit =
                wave_contributions.iter().any(|c| c.trigger_early_exit && c.verified != Verified::No);

            contributions.extend(wave_contributions);
            verdict = Self::aggregate(&contributions, &policy);

            if early_exit {
                break 'waves;
            }

            let eval_ctx = EvalContext {
                bot_probability: verdict.bot_probability,
                confidence: verdict.confidence,
                sink: &operation_sink,
                reputation_state: reputation_state_name.as_deref(),
            };
            if let Some(transition) = policy.transitions.iter().find(|t| t.matches(&eval_ctx)) {
                let is_escalation =
                    matches!(transition.action, TransitionAction::EscalateToSlowPath | TransitionAction::EscalateToAi | TransitionAction::GoTo(_));
                terminal_action = Some(transition.action.clone());
                if !is_escalation {
                    break 'waves;
                }
            }

            if verdict.bot_probability >= policy.immediate_block_threshold && verdict.confidence >= policy.min_confidence {
                break 'waves;
            }
        }

        if !policy.ai_path.is_empty()
            && verdict.bot_probability >= policy.ai_escalation_threshold
            && verdict.bot_probability < policy.immediate_block_threshold
            && !cancelled.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false)
        {
            let ai_resolved = self.services.detectors.detectors_for(&policy.ai_path);
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !ai_resolved.is_empty() && !remaining.is_zero() {
                let ai_contributions = self
                    .run_wave(&ai_resolved, &operation_sink, &request, &signature, coordinator_query, parallelism, remaining)
                    .await;
                contributions.extend(ai_contributions);
                verdict = Self::aggregate(&contributions, &policy);
            }
        }

        if let Some(action) = terminal_action {
            verdict.action = Self::map_transition_action(action, verdict.action);
        }

        let is_honeypot = operation_sink.has_match("request.honeypot_hit");
        let response_context = if is_honeypot {
            ResponseAnalysisContext::blocking_deep()
        } else {
            ResponseAnalysisContext::standard_async()
        };

        let cluster_id = self.services.cluster.snapshot().cluster_for(&signature).map(|c| c.id);

        DetectionOutcome {
            verdict,
            signature,
            reputation_pattern_id,
            policy_name: policy.name,
            response_context,
            operation_sink,
            cluster_id,
            request_id,
        }
    }

    /// Runs the fast path's pre-pipeline instant match and raises its
    /// confidence onto the operation sink — it is not itself a
    /// registered detector, so wave-0 detectors that want to consult it
    /// do so through `fastpath.match`.
    fn run_fastpath_check(&self, request: &RequestSnapshot, sink: &SignalSink) {
        let ip_string = request.ip.to_string();
        let subnet = subnet_string(request.ip);

        let client_side_owned = request.client_fingerprint.as_ref().and_then(|fp| {
            match (&fp.canvas_hash, &fp.webgl_hash, &fp.audio_hash) {
                (Some(c), Some(w), Some(a)) => Some((c.clone(), w.clone(), a.clone())),
                _ => None,
            }
        });
        let plugins_owned = request
            .client_fingerprint
            .as_ref()
            .filter(|fp| !fp.plugins.is_empty() || !fp.fonts.is_empty())
            .map(|fp| (fp.plugins.join(","), fp.fonts.join(",")));

        let inputs = IdentityInputs {
            ip: &ip_string,
            ua: &request.user_agent,
            subnet: &subnet,
            client_side: client_side_owned.as_ref().map(|(c, w, a)| (c.as_str(), w.as_str(), a.as_str())),
            plugins: plugins_owned.as_ref().map(|(p, f)| (p.as_str(), f.as_str())),
        };

        let outcome = self.services.fastpath.check(&inputs);
        sink.raise(SignalKey::new("fastpath.match"), outcome.confidence(), "fastpath_matcher");
    }

    /// Groups detectors already sorted by `(wave, priority)` into
    /// contiguous wave buckets without a second sort pass.
    fn group_by_wave(
        resolved: Vec<(DetectorManifest, Arc<dyn Detector>)>,
    ) -> Vec<(u32, Vec<(DetectorManifest, Arc<dyn Detector>)>)> {
        let mut waves: Vec<(u32, Vec<(DetectorManifest, Arc<dyn Detector>)>)> = Vec::new();
        for item in resolved {
            match waves.last_mut() {
                Some((wave, group)) if *wave == item.0.wave => group.push(item),
                _ => waves.push((item.0.wave, vec![item])),
            }
        }
        waves
    }

    /// Fans a single wave's detectors out with bounded parallelism: a
    /// semaphore caps in-flight detectors at the policy's parallelism,
    /// and each detector gets its own timeout against the wave's
    /// remaining budget. Uses in-place futures rather than `tokio::spawn`
    /// since `DetectorState` borrows the operation sink and request for
    /// the duration of the call and is not `'static`.
    async fn run_wave(
        &self,
        detectors: &[(DetectorManifest, Arc<dyn Detector>)],
        sink: &SignalSink,
        request: &RequestSnapshot,
        signature: &str,
        coordinator: &dyn CoordinatorQuery,
        parallelism: usize,
        remaining: Duration,
    ) -> Vec<DetectionContribution> {
        let semaphore = Semaphore::new(parallelism.max(1));
        let state = DetectorState { sink, request, signature, coordinator };

        let mut futures = FuturesUnordered::new();
        for (manifest, detector) in detectors {
            let state = &state;
            let semaphore = &semaphore;
            futures.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore is never closed mid-wave");
                let budget = detector.timeout().min(remaining);
                match tokio::time::timeout(budget, detector.contribute(state)).await {
                    Ok(contributions) => contributions,
                    Err(_) => {
                        tracing::warn!(detector = %manifest.name, "detector exceeded its timeout");
                        Vec::new()
                    }
                }
            });
        }

        let mut out = Vec::new();
        while let Some(contributions) = futures.next().await {
            out.extend(contributions);
        }
        out
    }

    fn aggregate(contributions: &[DetectionContribution], policy: &Policy) -> Verdict {
        let action_overrides: HashMap<RiskBand, RecommendedAction> = HashMap::new();
        let config = AggregationConfig {
            coverage_baseline: policy.coverage_baseline,
            min_confidence: policy.min_confidence,
            action_overrides: &action_overrides,
            weight_override: &policy.per_detector_weight,
        };
        ContributionAggregator::aggregate(contributions, &config)
    }

    fn map_transition_action(action: TransitionAction, fallback: RecommendedAction) -> RecommendedAction {
        match action {
            TransitionAction::Allow => RecommendedAction::Allow,
            TransitionAction::LogOnly => RecommendedAction::LogOnly,
            TransitionAction::Challenge => RecommendedAction::Challenge,
            TransitionAction::Throttle => RecommendedAction::Throttle,
            TransitionAction::Block => RecommendedAction::Block,
            TransitionAction::EscalateToSlowPath | TransitionAction::EscalateToAi | TransitionAction::GoTo(_) => fallback,
        }
    }

    /// Bounded synchronous (or fire-and-forget async) response analysis,
    /// dispatched per the mode `detect` decided for this operation.
    pub async fn analyze_response(&self, outcome: &DetectionOutcome, input: ResponseInput<'_>) -> ResponseAction {
        match outcome.response_context.mode {
            ResponseMode::Blocking => {
                self.services.response.analyze_blocking(&outcome.response_context, &input, &outcome.operation_sink).await
            }
            ResponseMode::Async => {
                self.services.response.clone().analyze_async(
                    outcome.response_context,
                    input.status,
                    input.body_prefix.to_vec(),
                    input.is_honeypot_path,
                    outcome.operation_sink.clone(),
                );
                ResponseAction::Allow
            }
        }
    }

    /// Composes and raises the operation's final summary, then drops
    /// the operation sink's last reference.
    pub fn finish_operation(
        &self,
        outcome: &DetectionOutcome,
        response_action: ResponseAction,
    ) -> bot_detect_response::OperationSummary {
        self.services.response.compose_operation_summary(
            &outcome.signature,
            &outcome.verdict,
            response_action,
            outcome.cluster_id,
            &self.services.global_sink,
            outcome.operation_sink.clone(),
        )
    }

    /// Post-response bookkeeping: feeds this operation's result back
    /// into the signature coordinator's behavior window, the reputation
    /// cache's decayed evidence, and the cluster engine's trigger
    /// counter. Cheap and synchronous; the coordinator update itself is
    /// queued, not applied inline.
    pub fn record_outcome(&self, request_path: &str, outcome: &DetectionOutcome, now_epoch_millis: i64, now_epoch_secs: i64) {
        self.services.coordinator.record_async(
            outcome.signature.clone(),
            bot_detect_coordinator::RequestSummary {
                request_id: outcome.request_id.clone(),
                path: request_path.to_string(),
                bot_probability: outcome.verdict.bot_probability,
                epoch_millis: now_epoch_millis,
            },
        );

        let is_bot = outcome.verdict.bot_probability >= 0.5;
        self.services.reputation.record_observation(&outcome.reputation_pattern_id, is_bot, now_epoch_secs);

        if is_bot {
            self.services.cluster.note_bot_detection();
        }
    }
}
