use std::collections::VecDeque;

use crate::config::CoordinatorConfig;

/// One request's contribution to a signature's behavior window.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub request_id: String,
    pub path: String,
    pub bot_probability: f64,
    pub epoch_millis: i64,
}

/// A point-in-time read of a signature's behavior, handed back by
/// [`crate::SignatureCoordinator::query`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct BehaviorSnapshot {
    pub path_entropy: f64,
    pub timing_cv: f64,
    pub avg_bot_probability: f64,
    pub aberration_score: f64,
    pub aberrant: bool,
    pub sample_size: usize,
}

impl BehaviorSnapshot {
    fn empty() -> Self {
        Self { path_entropy: 0.0, timing_cv: 0.0, avg_bot_probability: 0.0, aberration_score: 0.0, aberrant: false, sample_size: 0 }
    }
}

/// Per-signature behavior window. Lives behind one mutex, touched only
/// by the update queue shard that owns this signature's key and read
/// by `query()` from any task.
pub struct SignatureAtom {
    entries: VecDeque<RequestSummary>,
    already_flagged: bool,
}

impl SignatureAtom {
    pub fn new() -> Self {
        Self { entries: VecDeque::new(), already_flagged: false }
    }

    /// Appends `summary`, evicts stale/overflow entries, and recomputes
    /// the behavior snapshot. Returns `Some(snapshot)` the first time
    /// this atom crosses into aberrant territory, so the caller raises
    /// exactly one signal per episode instead of one per request.
    ///
    /// Recording the same `request_id` twice is idempotent: the window
    /// already holding that id is left untouched and its current
    /// snapshot is handed back unchanged.
    pub fn record(&mut self, summary: RequestSummary, config: &CoordinatorConfig) -> (BehaviorSnapshot, bool) {
        if self.entries.iter().any(|e| e.request_id == summary.request_id) {
            return (self.recompute(config), false);
        }
        self.entries.push_back(summary);

        let window_floor = self.entries.back().map(|e| e.epoch_millis).unwrap_or(0)
            - config.signature_window.as_millis() as i64;
        while self.entries.front().map(|e| e.epoch_millis < window_floor).unwrap_or(false) {
            self.entries.pop_front();
        }
        while self.entries.len() > config.max_requests_per_signature {
            self.entries.pop_front();
        }

        let snapshot = self.recompute(config);
        let newly_aberrant = snapshot.aberrant && !self.already_flagged;
        if snapshot.aberrant {
            self.already_flagged = true;
        } else {
            self.already_flagged = false;
        }
        (snapshot, newly_aberrant)
    }

    /// Read-only recomputation for `query()` — does not mutate the
    /// already-flagged edge tracked by `record`.
    pub fn snapshot_only(&self, config: &CoordinatorConfig) -> BehaviorSnapshot {
        self.recompute(config)
    }

    fn recompute(&self, config: &CoordinatorConfig) -> BehaviorSnapshot {
        if self.entries.is_empty() {
            return BehaviorSnapshot::empty();
        }

        let n = self.entries.len();
        let path_entropy = Self::path_entropy(&self.entries);
        let timing_cv = Self::timing_cv(&self.entries);
        let avg_bot_probability =
            self.entries.iter().map(|e| e.bot_probability).sum::<f64>() / n as f64;

        let mut score = 0.0;
        if avg_bot_probability > 0.6 {
            score += 0.3 * avg_bot_probability;
        }
        if path_entropy > 3.0 {
            score += 0.25;
        }
        if timing_cv < 0.15 {
            score += 0.25;
        }
        if Self::mean_interval_seconds(&self.entries) < 2.0 {
            score += 0.20;
        }
        let aberration_score = score.min(1.0);
        let aberrant =
            aberration_score >= config.aberration_score_threshold && n >= config.min_requests_for_aberration;

        BehaviorSnapshot { path_entropy, timing_cv, avg_bot_probability, aberration_score, aberrant, sample_size: n }
    }

    fn path_entropy(entries: &VecDeque<RequestSummary>) -> f64 {
        let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
        for e in entries {
            *counts.entry(e.path.as_str()).or_insert(0) += 1;
        }
        let total = entries.len() as f64;
        -counts
            .values()
            .map(|&c| {
                let p = c as f64 / total;
                p * p.log2()
            })
            .sum::<f64>()
    }

    fn intervals_millis(entries: &VecDeque<RequestSummary>) -> Vec<f64> {
        entries
            .iter()
            .zip(entries.iter().skip(1))
            .map(|(a, b)| (b.epoch_millis - a.epoch_millis).max(0) as f64)
            .collect()
    }

    fn timing_cv(entries: &VecDeque<RequestSummary>) -> f64 {
        let intervals = Self::intervals_millis(entries);
        if intervals.len() < 2 {
            return 0.0;
        }
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if mean <= 0.0 {
            return 0.0;
        }
        let variance =
            intervals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
        variance.sqrt() / mean
    }

    fn mean_interval_seconds(entries: &VecDeque<RequestSummary>) -> f64 {
        let intervals = Self::intervals_millis(entries);
        if intervals.is_empty() {
            return f64::MAX;
        }
        (intervals.iter().sum::<f64>() / intervals.len() as f64) / 1000.0
    }
}

impl Default for SignatureAtom {
    fn default() -> Self {
        Self::new()
    }
}
