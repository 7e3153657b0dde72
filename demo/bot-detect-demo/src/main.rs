// =============================================================================
// bot-detect-demo — reference HTTP server exercising the bot-detection
// engine end to end (v1).
// =============================================================================

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bot_detect::{
    ClientFingerprint, Engine, RecommendedAction, RequestSnapshot, ResponseAction, ResponseInput, RiskBand,
};
use bot_detect_builtin::KnownBot;
use bot_detect_config::EngineConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
    /// Maps a returned signature back to the `(ip, ua)` pair that
    /// produced it, so the client-fingerprint callback can merge its
    /// factors into the right fast-path record without the caller
    /// having to resend raw identity. Mirrors the teacher's `dedup`
    /// DashMap + TTL-eviction pattern.
    recent_signatures: Arc<DashMap<String, (String, String, u64)>>,
    metrics: Arc<Metrics>,
}

struct Metrics {
    requests_total: AtomicU64,
    allowed: AtomicU64,
    log_only: AtomicU64,
    challenged: AtomicU64,
    throttled: AtomicU64,
    blocked: AtomicU64,
    masked: AtomicU64,
    fingerprint_merged: AtomicU64,
    fingerprint_unknown_signature: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            log_only: AtomicU64::new(0),
            challenged: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            masked: AtomicU64::new(0),
            fingerprint_merged: AtomicU64::new(0),
            fingerprint_unknown_signature: AtomicU64::new(0),
        }
    }

    fn record_action(&self, action: RecommendedAction) {
        let counter = match action {
            RecommendedAction::Allow => &self.allowed,
            RecommendedAction::LogOnly => &self.log_only,
            RecommendedAction::Challenge => &self.challenged,
            RecommendedAction::Throttle => &self.throttled,
            RecommendedAction::Block => &self.blocked,
            RecommendedAction::MaskResponse => &self.masked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

const SIGNATURE_TTL_SECS: u64 = 300;

#[derive(Deserialize)]
struct DetectRequestBody {
    #[serde(default = "default_method")]
    method: String,
    path: String,
    ip: IpAddr,
    #[serde(default)]
    user_agent: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    is_websocket_upgrade: bool,
    #[serde(default)]
    client_fingerprint: Option<ClientFingerprint>,
    /// What the handler would have sent back, so this demo can run the
    /// response-analysis pass the way a real middleware would after the
    /// downstream handler runs. Defaults to a clean 200 with no body.
    #[serde(default = "default_status")]
    response_status: u16,
    #[serde(default)]
    response_body_prefix: String,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

#[derive(Serialize)]
struct DetectResponseBody {
    request_id: String,
    signature: String,
    bot_probability: f64,
    confidence: f64,
    risk_band: RiskBand,
    action: RecommendedAction,
    bot_type: String,
    bot_name: Option<String>,
    reasons: Vec<String>,
    processing_ms: f64,
    response_action: ResponseAction,
}

/// Resolves the client IP the way a trusted-proxy-aware middleware
/// would: the first hop in `X-Forwarded-For` wins if present, since the
/// demo always runs behind the harness's synthetic "edge"; otherwise
/// the caller-supplied `ip` field stands in for the socket peer address.
fn resolve_client_ip(headers: &BTreeMap<String, String>, fallback: IpAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or(fallback)
}

#[instrument(skip_all)]
async fn detect(State(state): State<AppState>, Json(body): Json<DetectRequestBody>) -> impl IntoResponse {
    let start = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let ip = resolve_client_ip(&body.headers, body.ip);
    let request_id = uuid::Uuid::new_v4().to_string();

    let request = RequestSnapshot {
        request_id: request_id.clone(),
        path: body.path.clone(),
        method: body.method,
        ip,
        user_agent: body.user_agent.clone(),
        headers: body.headers,
        received_at: chrono::Utc::now(),
        is_websocket_upgrade: body.is_websocket_upgrade,
        client_fingerprint: body.client_fingerprint,
    };

    let orchestrator = state.engine.orchestrator();
    let outcome = orchestrator.detect(request).await;

    let response_input = ResponseInput {
        status: body.response_status,
        headers: &[],
        body_prefix: body.response_body_prefix.as_bytes(),
        is_honeypot_path: outcome.operation_sink.has_match("request.honeypot_hit"),
    };
    let response_action = orchestrator.analyze_response(&outcome, response_input).await;
    let summary = orchestrator.finish_operation(&outcome, response_action);

    let now = chrono::Utc::now();
    orchestrator.record_outcome(&body.path, &outcome, now.timestamp_millis(), now.timestamp());

    state
        .recent_signatures
        .insert(outcome.signature.clone(), (ip.to_string(), body.user_agent, now.timestamp() as u64));
    state.metrics.record_action(outcome.verdict.action);

    let processing_ms = start.elapsed().as_secs_f64() * 1000.0;
    let body = DetectResponseBody {
        request_id,
        signature: outcome.signature,
        bot_probability: outcome.verdict.bot_probability,
        confidence: outcome.verdict.confidence,
        risk_band: outcome.verdict.risk_band,
        action: outcome.verdict.action,
        bot_type: format!("{:?}", outcome.verdict.bot_type),
        bot_name: outcome.verdict.bot_name,
        reasons: outcome.verdict.reasons,
        processing_ms,
        response_action: summary.response_action,
    };

    let mut headers = HeaderMap::new();
    let bot_detected = body.bot_probability >= 0.5;
    insert_header(&mut headers, "x-bot-detected", bot_detected.to_string());
    insert_header(&mut headers, "x-bot-detection-probability", format!("{:.4}", body.bot_probability));
    insert_header(&mut headers, "x-bot-confidence", format!("{:.4}", body.confidence));
    insert_header(&mut headers, "x-bot-type", body.bot_type.clone());
    insert_header(&mut headers, "x-bot-name", body.bot_name.clone().unwrap_or_default());
    insert_header(&mut headers, "x-bot-detection-riskband", format!("{:?}", body.risk_band));
    insert_header(
        &mut headers,
        "x-bot-detection-reasons",
        serde_json::to_string(&body.reasons).unwrap_or_else(|_| "[]".to_string()),
    );
    insert_header(&mut headers, "x-bot-detection-processingms", format!("{:.3}", processing_ms));
    if !matches!(body.response_action, ResponseAction::Allow) {
        insert_header(&mut headers, "x-bot-response-action", format!("{:?}", body.response_action));
    }

    info!(
        signature = %body.signature,
        action = ?body.action,
        bot_probability = body.bot_probability,
        "detect_complete"
    );

    (StatusCode::OK, headers, Json(body))
}

#[derive(Deserialize)]
struct ClientFingerprintCallbackBody {
    canvas_hash: String,
    webgl_hash: String,
    audio_hash: String,
}

#[derive(Serialize)]
struct ClientFingerprintAck {
    received: bool,
    signature: String,
}

#[instrument(skip_all)]
async fn client_fingerprint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ClientFingerprintCallbackBody>,
) -> impl IntoResponse {
    let Some(signature) = headers.get("x-signature-id").and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, Json(ClientFingerprintAck { received: false, signature: String::new() }));
    };

    match state.recent_signatures.get(signature) {
        Some(entry) => {
            let (ip, ua, _) = entry.value().clone();
            state.engine.services().fastpath.merge_client_side(
                &ip,
                &ua,
                &body.canvas_hash,
                &body.webgl_hash,
                &body.audio_hash,
            );
            state.metrics.fingerprint_merged.fetch_add(1, Ordering::Relaxed);
            (StatusCode::OK, Json(ClientFingerprintAck { received: true, signature: signature.to_string() }))
        }
        None => {
            warn!(%signature, "client-fingerprint callback for unknown signature");
            state.metrics.fingerprint_unknown_signature.fetch_add(1, Ordering::Relaxed);
            (StatusCode::NOT_FOUND, Json(ClientFingerprintAck { received: false, signature: signature.to_string() }))
        }
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(value) = axum::http::HeaderValue::from_str(&value) {
        headers.insert(name, value);
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn ready(State(state): State<AppState>) -> StatusCode {
    if state.engine.services().detectors.is_empty() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

#[derive(Serialize)]
struct MetricsResponse {
    requests_total: u64,
    allowed: u64,
    log_only: u64,
    challenged: u64,
    throttled: u64,
    blocked: u64,
    masked: u64,
    fingerprint_merged: u64,
    fingerprint_unknown_signature: u64,
    sink_raised: u64,
    sink_dropped: u64,
    sink_sensed: u64,
    fastpath_stored_signatures: usize,
    coordinator_tracked_signatures: u64,
    reputation_patterns: usize,
    clusters: usize,
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let services = state.engine.services();
    let sink_stats = services.global_sink.stats();
    Json(MetricsResponse {
        requests_total: state.metrics.requests_total.load(Ordering::Relaxed),
        allowed: state.metrics.allowed.load(Ordering::Relaxed),
        log_only: state.metrics.log_only.load(Ordering::Relaxed),
        challenged: state.metrics.challenged.load(Ordering::Relaxed),
        throttled: state.metrics.throttled.load(Ordering::Relaxed),
        blocked: state.metrics.blocked.load(Ordering::Relaxed),
        masked: state.metrics.masked.load(Ordering::Relaxed),
        fingerprint_merged: state.metrics.fingerprint_merged.load(Ordering::Relaxed),
        fingerprint_unknown_signature: state.metrics.fingerprint_unknown_signature.load(Ordering::Relaxed),
        sink_raised: sink_stats.raised,
        sink_dropped: sink_stats.dropped,
        sink_sensed: sink_stats.sensed,
        fastpath_stored_signatures: services.fastpath.stored_signature_count(),
        coordinator_tracked_signatures: services.coordinator.tracked_signature_count(),
        reputation_patterns: services.reputation.len(),
        clusters: services.cluster.snapshot().clusters.len(),
    })
}

async fn evict_stale_signatures(map: Arc<DashMap<String, (String, String, u64)>>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        interval.tick().await;
        let now = chrono::Utc::now().timestamp() as u64;
        let before = map.len();
        map.retain(|_, (_, _, seen_at)| now.saturating_sub(*seen_at) < SIGNATURE_TTL_SECS);
        let after = map.len();
        if before != after {
            info!(evicted = before - after, remaining = after, "signature_cache_eviction");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "bot_detect_demo=info,tower_http=info".into()))
        .json()
        .init();

    let config = EngineConfig::from_env()?;
    let known_bots = vec![KnownBot { name: "partner-search", bot_type: bot_detect::BotType::SearchEngine, secret: "dev-partner-secret" }];
    let engine = Arc::new(Engine::new(config, known_bots).map_err(anyhow::Error::from)?);
    info!("bot-detect engine initialised");

    let recent_signatures = Arc::new(DashMap::new());
    tokio::spawn(evict_stale_signatures(recent_signatures.clone()));

    let state = AppState { engine, recent_signatures, metrics: Arc::new(Metrics::new()) };

    let app = Router::new()
        .route("/v1/detect", post(detect))
        .route("/api/v1/bot-detection/client-fingerprint", post(client_fingerprint))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CompressionLayer::new()));

    let port: u16 = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown");
        })
        .await?;

    Ok(())
}
