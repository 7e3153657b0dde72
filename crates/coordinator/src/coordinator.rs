use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use bot_detect_errors::CoordinatorBackpressure;
use bot_detect_identity::Signature;
use bot_detect_signal::{SignalKey, SignalPayload, SignalSink};
use moka::sync::Cache;

use crate::atom::{BehaviorSnapshot, RequestSummary, SignatureAtom};
use crate::config::CoordinatorConfig;
use crate::queue::{Update, UpdateQueue};

const ABERRATION_KEY: &str = "coordinator.aberration";
const BACKPRESSURE_KEY: &str = "coordinator.backpressure";

/// Everything the update-queue shards and `query()` share. Lives behind
/// an `Arc` so shards can hold a clone without the coordinator itself
/// needing a lock.
pub(crate) struct Inner {
    atoms: Cache<Signature, Arc<StdMutex<SignatureAtom>>>,
    global_sink: Arc<SignalSink>,
    config: CoordinatorConfig,
    failed_updates: AtomicU64,
    dropped_updates: AtomicU64,
}

impl Inner {
    pub(crate) fn apply_update(&self, update: Update) {
        let atom = self
            .atoms
            .get_with(update.signature.clone(), || Arc::new(StdMutex::new(SignatureAtom::new())));

        let (snapshot, newly_aberrant) = match atom.lock() {
            Ok(mut guard) => guard.record(update.summary, &self.config),
            Err(_) => {
                // a prior panic poisoned this signature's lock: record the
                // failure and move on, per the "recording failures never
                // propagate to the request path" contract.
                self.failed_updates.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(signature = %update.signature, "signature atom lock poisoned");
                return;
            }
        };

        if newly_aberrant {
            self.raise_aberration(&update.signature, &snapshot);
        }
    }

    fn raise_aberration(&self, signature: &str, snapshot: &BehaviorSnapshot) {
        let mut record = BTreeMap::new();
        record.insert("signature".to_string(), SignalPayload::Text(signature.to_string()));
        record.insert("score".to_string(), SignalPayload::Float(snapshot.aberration_score));
        record.insert(
            "reason".to_string(),
            SignalPayload::Text(format!(
                "avg_bot={:.2} entropy={:.2} cv={:.2}",
                snapshot.avg_bot_probability, snapshot.path_entropy, snapshot.timing_cv
            )),
        );
        self.global_sink.raise(
            SignalKey::new(ABERRATION_KEY),
            SignalPayload::Record(record),
            "signature_coordinator",
        );
        tracing::info!(signature, score = snapshot.aberration_score, "signature aberration raised");
    }

    /// Called by the update queue when a shard is at capacity and a
    /// pending update for `signature` gets evicted to make room.
    pub(crate) fn raise_backpressure(&self, signature: &str) {
        self.dropped_updates.fetch_add(1, Ordering::Relaxed);
        let error = CoordinatorBackpressure { signature: signature.to_string() };
        let mut record = BTreeMap::new();
        record.insert("signature".to_string(), SignalPayload::Text(signature.to_string()));
        record.insert("reason".to_string(), SignalPayload::Text(error.to_string()));
        self.global_sink.raise(SignalKey::new(BACKPRESSURE_KEY), SignalPayload::Record(record), "signature_coordinator");
        tracing::warn!(signature, "coordinator update queue backpressure: oldest pending update dropped");
    }
}

/// Process-scoped singleton that tracks per-signature behavior across
/// requests: path entropy, timing regularity, and average bot
/// probability inside a sliding window, flagging aberrant signatures
/// onto the global signal sink.
pub struct SignatureCoordinator {
    inner: Arc<Inner>,
    queue: UpdateQueue,
}

impl SignatureCoordinator {
    pub fn new(global_sink: Arc<SignalSink>) -> Self {
        Self::with_config(global_sink, CoordinatorConfig::default())
    }

    pub fn with_config(global_sink: Arc<SignalSink>, config: CoordinatorConfig) -> Self {
        let atoms = Cache::builder()
            .max_capacity(config.max_signatures_in_window)
            .time_to_idle(config.signature_ttl)
            .time_to_live(config.signature_ttl * 2)
            .build();

        let inner = Arc::new(Inner {
            atoms,
            global_sink,
            config: config.clone(),
            failed_updates: AtomicU64::new(0),
            dropped_updates: AtomicU64::new(0),
        });
        let queue = UpdateQueue::spawn(config.queue_shards, config.shard_queue_capacity, inner.clone());
        Self { inner, queue }
    }

    /// Enqueues an update keyed by signature. Updates for the same
    /// signature run strictly serially; different signatures run in
    /// parallel. Never blocks the caller and never panics — a shard at
    /// capacity evicts its oldest pending update for this signature (or
    /// its oldest entry overall) and raises `CoordinatorBackpressure`
    /// rather than growing unbounded.
    pub fn record_async(&self, signature: impl Into<Signature>, summary: RequestSummary) {
        self.queue.enqueue(Update { signature: signature.into(), summary }, &self.inner);
    }

    /// O(1) read of the current behavior snapshot. Returns `None` if the
    /// signature has never been recorded or has aged out of the window.
    pub fn query(&self, signature: &str) -> Option<BehaviorSnapshot> {
        let atom = self.inner.atoms.get(signature)?;
        atom.lock().ok().map(|guard| guard.snapshot_only(&self.inner.config))
    }

    /// Signatures currently flagged aberrant, newest first — a
    /// synchronous stand-in for the "lazy stream" the contract
    /// describes, backed by the same global sink every aberration
    /// raise writes to.
    pub fn aberration_signals(&self) -> Vec<bot_detect_signal::SignalEntry> {
        self.inner.global_sink.sense(ABERRATION_KEY)
    }

    pub fn failed_update_count(&self) -> u64 {
        self.inner.failed_updates.load(Ordering::Relaxed)
    }

    /// How many pending updates have been evicted by queue backpressure
    /// (shard at capacity) since startup.
    pub fn dropped_update_count(&self) -> u64 {
        self.inner.dropped_updates.load(Ordering::Relaxed)
    }

    pub fn tracked_signature_count(&self) -> u64 {
        self.inner.atoms.entry_count()
    }
}

impl bot_detect_detector::CoordinatorQuery for SignatureCoordinator {
    fn path_entropy(&self, signature: &str) -> Option<f64> {
        self.query(signature).map(|s| s.path_entropy)
    }

    fn timing_cv(&self, signature: &str) -> Option<f64> {
        self.query(signature).map(|s| s.timing_cv)
    }

    fn avg_bot_probability(&self, signature: &str) -> Option<f64> {
        self.query(signature).map(|s| s.avg_bot_probability)
    }

    fn is_aberrant(&self, signature: &str) -> bool {
        self.query(signature).map(|s| s.aberrant).unwrap_or(false)
    }

    fn request_count_in_window(&self, signature: &str) -> usize {
        self.query(signature).map(|s| s.sample_size).unwrap_or(0)
    }
}
