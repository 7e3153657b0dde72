use std::sync::Mutex;

use dashmap::DashMap;

use crate::pattern::{ReputationPattern, ReputationState};

#[derive(Debug, Clone)]
pub struct ReputationConfig {
    pub decay_tau_hours: f64,
    pub min_sample_size: f64,
    pub promote_threshold: f64,
    pub demote_threshold: f64,
    /// Minimum accumulated support before a `ConfirmedBad`/`ManuallyBlocked`
    /// pattern can trigger an instant-block fast-path contribution.
    pub min_support_abort: f64,
    /// Minimum accumulated support before a `ConfirmedGood`/`ManuallyAllowed`
    /// pattern can trigger a strong-human fast-path contribution.
    pub min_support_allow: f64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            decay_tau_hours: 168.0,
            min_sample_size: 10.0,
            promote_threshold: 0.7,
            demote_threshold: 0.3,
            min_support_abort: 20.0,
            min_support_allow: 20.0,
        }
    }
}

/// A fast-path-eligible verdict from a pattern's reputation, per the
/// Wave 0 consumer contract in §4.9.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FastPathVerdict {
    /// `ConfirmedBad`/`ManuallyBlocked`, enough support, high bot score.
    InstantBlock { bot_score: f64, support: f64 },
    /// `ConfirmedGood`/`ManuallyAllowed`, enough support. Not an early
    /// exit — `VerifiedGood` is reserved for cryptographic verification.
    StrongHuman { support: f64 },
    None,
}

/// Maps `patternId` to [`ReputationPattern`], evolving non-sticky states
/// from time-decayed evidence and leaving `Confirmed*`/`Manually*`
/// untouched except through [`ReputationCache::admin_set`].
pub struct ReputationCache {
    entries: DashMap<String, Mutex<ReputationPattern>>,
    config: ReputationConfig,
}

impl ReputationCache {
    pub fn new() -> Self {
        Self::with_config(ReputationConfig::default())
    }

    pub fn with_config(config: ReputationConfig) -> Self {
        Self { entries: DashMap::new(), config }
    }

    pub fn query(&self, pattern_id: &str) -> Option<ReputationPattern> {
        self.entries.get(pattern_id).and_then(|e| e.lock().ok().map(|g| g.clone()))
    }

    /// Folds one observation into the pattern's support EMA and,
    /// unless the state is sticky, re-evaluates Neutral/ProbablyGood/
    /// ProbablyBad from the updated score.
    pub fn record_observation(&self, pattern_id: &str, is_bot: bool, now_epoch_secs: i64) {
        let entry = self
            .entries
            .entry(pattern_id.to_string())
            .or_insert_with(|| Mutex::new(ReputationPattern::new(now_epoch_secs)));
        let Ok(mut guard) = entry.lock() else {
            tracing::warn!(pattern_id, "reputation pattern lock poisoned");
            return;
        };

        let dt_hours = ((now_epoch_secs - guard.last_update_epoch_secs).max(0) as f64) / 3600.0;
        let decay = (-dt_hours / self.config.decay_tau_hours).exp();
        let sample = if is_bot { 1.0 } else { 0.0 };
        guard.bot_score_ema = guard.bot_score_ema * decay + sample * (1.0 - decay);
        guard.support = guard.support * decay + 1.0;
        guard.last_update_epoch_secs = now_epoch_secs;

        if !guard.state.is_sticky() {
            guard.state = if guard.support < self.config.min_sample_size {
                ReputationState::Neutral
            } else if guard.bot_score_ema >= self.config.promote_threshold {
                ReputationState::ProbablyBad
            } else if guard.bot_score_ema <= self.config.demote_threshold {
                ReputationState::ProbablyGood
            } else {
                ReputationState::Neutral
            };
        }
    }

    /// Administrative override — the only way a pattern reaches or
    /// leaves a `Confirmed*`/`Manually*` state.
    pub fn admin_set(&self, pattern_id: &str, state: ReputationState, now_epoch_secs: i64) {
        let entry = self
            .entries
            .entry(pattern_id.to_string())
            .or_insert_with(|| Mutex::new(ReputationPattern::new(now_epoch_secs)));
        if let Ok(mut guard) = entry.lock() {
            guard.state = state;
            guard.last_update_epoch_secs = now_epoch_secs;
            tracing::info!(pattern_id, ?state, "reputation pattern administratively set");
        }
    }

    pub fn fastpath_verdict(&self, pattern_id: &str) -> FastPathVerdict {
        let Some(pattern) = self.query(pattern_id) else { return FastPathVerdict::None };
        match pattern.state {
            ReputationState::ConfirmedBad | ReputationState::ManuallyBlocked
                if pattern.support >= self.config.min_support_abort && pattern.bot_score_ema >= 0.9 =>
            {
                FastPathVerdict::InstantBlock { bot_score: pattern.bot_score_ema, support: pattern.support }
            }
            ReputationState::ConfirmedGood | ReputationState::ManuallyAllowed
                if pattern.support >= self.config.min_support_allow =>
            {
                FastPathVerdict::StrongHuman { support: pattern.support }
            }
            _ => FastPathVerdict::None,
        }
    }

    /// Softer bias-detector contribution for non-confirmed states: a
    /// signed delta toward bad (+) or good (-), scaled by how much
    /// support backs it.
    pub fn bias_contribution(&self, pattern_id: &str) -> Option<(f64, f64)> {
        let pattern = self.query(pattern_id)?;
        if pattern.state.is_sticky() {
            return None;
        }
        let confidence_scale = (pattern.support / self.config.min_sample_size.max(1.0)).min(1.0);
        match pattern.state {
            ReputationState::ProbablyBad => Some(((pattern.bot_score_ema - 0.5) * 2.0, confidence_scale)),
            ReputationState::ProbablyGood => Some(((pattern.bot_score_ema - 0.5) * 2.0, confidence_scale)),
            ReputationState::Neutral => None,
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReputationCache {
    fn default() -> Self {
        Self::new()
    }
}
