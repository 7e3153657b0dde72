/// Reputation state machine. `Confirmed*`/`Manually*` only change via
/// [`crate::ReputationCache::admin_set`] — never from accumulated
/// evidence — and are sticky once set. The rest move probabilistically
/// as support accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReputationState {
    Neutral,
    ProbablyGood,
    ProbablyBad,
    ConfirmedGood,
    ConfirmedBad,
    ManuallyAllowed,
    ManuallyBlocked,
}

impl ReputationState {
    /// `Confirmed*`/`Manually*` are monotonic: once set, only an admin
    /// call can change them. Evidence-driven updates must skip these.
    pub fn is_sticky(self) -> bool {
        matches!(
            self,
            ReputationState::ConfirmedGood
                | ReputationState::ConfirmedBad
                | ReputationState::ManuallyAllowed
                | ReputationState::ManuallyBlocked
        )
    }

    pub fn is_bad(self) -> bool {
        matches!(self, ReputationState::ConfirmedBad | ReputationState::ManuallyBlocked | ReputationState::ProbablyBad)
    }

    pub fn is_good(self) -> bool {
        matches!(self, ReputationState::ConfirmedGood | ReputationState::ManuallyAllowed | ReputationState::ProbablyGood)
    }
}

/// One tracked pattern's reputation: its current state plus the
/// time-decayed evidence that earned it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReputationPattern {
    pub state: ReputationState,
    /// EMA of "was this a bot" observations, in `[0, 1]`.
    pub bot_score_ema: f64,
    /// Accumulated evidence weight — not a plain observation count, an
    /// EMA'd measure that decays the same way the country tracker's
    /// does, so stale support doesn't linger forever.
    pub support: f64,
    pub last_update_epoch_secs: i64,
}

impl ReputationPattern {
    pub fn new(now_epoch_secs: i64) -> Self {
        Self { state: ReputationState::Neutral, bot_score_ema: 0.5, support: 0.0, last_update_epoch_secs: now_epoch_secs }
    }
}
