use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

/// EMA bot-rate tracker per country, decaying with half-life-like
/// factor `exp(-dt/tau)`. Returns 0 until enough samples accumulate so
/// a single report can't swing a country's reputation.
pub struct CountryReputationTracker {
    entries: DashMap<String, Entry>,
    tau_hours: f64,
    min_sample_size: u32,
}

struct Entry {
    ema: f64,
    count: u32,
    last_update_epoch_secs: AtomicI64,
}

impl CountryReputationTracker {
    pub fn new() -> Self {
        Self::with_params(168.0, 10)
    }

    pub fn with_params(tau_hours: f64, min_sample_size: u32) -> Self {
        Self { entries: DashMap::new(), tau_hours, min_sample_size }
    }

    pub fn observe(&self, country: &str, is_bot: bool, now_epoch_secs: i64) {
        let sample = if is_bot { 1.0 } else { 0.0 };
        self.entries
            .entry(country.to_string())
            .and_modify(|entry| {
                let last = entry.last_update_epoch_secs.load(Ordering::Relaxed);
                let dt_hours = ((now_epoch_secs - last).max(0) as f64) / 3600.0;
                let decay = (-dt_hours / self.tau_hours).exp();
                entry.ema = entry.ema * decay + sample * (1.0 - decay);
                entry.count += 1;
                entry.last_update_epoch_secs.store(now_epoch_secs, Ordering::Relaxed);
            })
            .or_insert_with(|| Entry { ema: sample, count: 1, last_update_epoch_secs: AtomicI64::new(now_epoch_secs) });
    }

    pub fn rate_for(&self, country: &str) -> f64 {
        match self.entries.get(country) {
            Some(entry) if entry.count >= self.min_sample_size => entry.ema,
            _ => 0.0,
        }
    }
}

impl Default for CountryReputationTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_min_sample_size_returns_zero() {
        let tracker = CountryReputationTracker::with_params(168.0, 10);
        for _ in 0..5 {
            tracker.observe("XX", true, 0);
        }
        assert_eq!(tracker.rate_for("XX"), 0.0);
    }

    #[test]
    fn sustained_bot_reports_raise_the_rate() {
        let tracker = CountryReputationTracker::with_params(168.0, 3);
        for i in 0..10 {
            tracker.observe("YY", true, i * 3600);
        }
        assert!(tracker.rate_for("YY") > 0.5);
    }

    #[test]
    fn old_samples_decay_toward_new_evidence() {
        let tracker = CountryReputationTracker::with_params(1.0, 1);
        tracker.observe("ZZ", true, 0);
        // a week later, clean traffic should dominate
        tracker.observe("ZZ", false, 7 * 24 * 3600);
        assert!(tracker.rate_for("ZZ") < 0.1);
    }
}
