use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::sync::Cache;

use crate::entry::SignalEntry;
use crate::key::{SignalKey, SignalPattern};
use bot_detect_errors::SinkOverflow;

/// Point-in-time counters, exposed the way the teacher exposes its
/// `Metrics` struct through a `/metrics` endpoint.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SinkStats {
    pub raised: u64,
    pub dropped: u64,
    pub sensed: u64,
    pub len: usize,
}

struct Counters {
    raised: AtomicU64,
    dropped: AtomicU64,
    sensed: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self { raised: AtomicU64::new(0), dropped: AtomicU64::new(0), sensed: AtomicU64::new(0) }
    }
}

enum Backing {
    /// Operation-scoped: rarely evicts, capacity exists mostly as a
    /// safety valve against a runaway detector.
    Bounded { entries: DashMap<u64, SignalEntry>, capacity: usize },
    /// Process-scoped global sink: LRU by access plus an absolute TTL,
    /// collapsing the "concurrent dictionary + LinkedList LRU" pattern
    /// into the single primitive the redesign notes call for.
    SlidingTtl(Cache<u64, SignalEntry>),
}

/// A scoped, thread-safe container of raised signals.
///
/// Concurrent `Raise` calls from different detectors are not ordered
/// relative to one another beyond their `seq` assignment; `Sense` always
/// returns a consistent, newest-first snapshot captured at call time.
pub struct SignalSink {
    backing: Backing,
    seq: AtomicU64,
    counters: Counters,
}

impl SignalSink {
    /// Default operation sink: capacity 1000, lives for the request.
    pub fn operation_scoped() -> Self {
        Self::operation_scoped_with_capacity(1000)
    }

    pub fn operation_scoped_with_capacity(capacity: usize) -> Self {
        Self {
            backing: Backing::Bounded { entries: DashMap::with_capacity(capacity.min(256)), capacity },
            seq: AtomicU64::new(0),
            counters: Counters::new(),
        }
    }

    /// Default global sink: 100,000 entries or 24h, whichever comes first.
    pub fn global() -> Self {
        Self::global_with_limits(100_000, Duration::from_secs(24 * 3600))
    }

    pub fn global_with_limits(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(capacity).time_to_live(ttl).build();
        Self { backing: Backing::SlidingTtl(cache), seq: AtomicU64::new(0), counters: Counters::new() }
    }

    /// O(1) amortised append. May evict the oldest entry when over
    /// capacity; eviction increments the drop counter and never errors.
    pub fn raise(&self, key: impl Into<SignalKey>, payload: impl Into<crate::payload::SignalPayload>, detector: impl Into<String>) {
        self.raise_entry(SignalEntry::new(key.into(), payload.into(), detector));
    }

    pub fn raise_entry(&self, mut entry: SignalEntry) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        entry.seq = seq;
        self.counters.raised.fetch_add(1, Ordering::Relaxed);

        match &self.backing {
            Backing::Bounded { entries, capacity } => {
                if entries.len() >= *capacity {
                    if let Some(oldest) = entries.iter().map(|e| e.seq).min() {
                        entries.remove(&oldest);
                        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(capacity = *capacity, "operation sink evicted oldest entry");
                    }
                }
                entries.insert(seq, entry);
            }
            Backing::SlidingTtl(cache) => {
                if cache.entry_count() >= cache.policy().max_capacity().unwrap_or(u64::MAX) {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
                cache.insert(seq, entry);
            }
        }
    }

    /// Returns every matching entry, newest first, as an immutable
    /// snapshot captured right now.
    pub fn sense(&self, pattern: impl Into<SignalPattern>) -> Vec<SignalEntry> {
        let pattern = pattern.into();
        self.counters.sensed.fetch_add(1, Ordering::Relaxed);
        let mut matched: Vec<SignalEntry> = match &self.backing {
            Backing::Bounded { entries, .. } => entries
                .iter()
                .filter(|e| pattern.matches(&e.key))
                .map(|e| e.value().clone())
                .collect(),
            Backing::SlidingTtl(cache) => {
                cache.iter().filter(|(_, e)| pattern.matches(&e.key)).map(|(_, e)| e).collect()
            }
        };
        matched.sort_by(|a, b| b.seq.cmp(&a.seq));
        matched
    }

    /// Newest matching entry, if any.
    pub fn sense_latest(&self, pattern: impl Into<SignalPattern>) -> Option<SignalEntry> {
        self.sense(pattern).into_iter().next()
    }

    /// True if any entry currently matches `pattern` — used by the
    /// orchestrator to decide whether a wave-N detector's triggers are
    /// satisfied without materialising the whole match set.
    pub fn has_match(&self, pattern: impl Into<SignalPattern>) -> bool {
        let pattern = pattern.into();
        match &self.backing {
            Backing::Bounded { entries, .. } => entries.iter().any(|e| pattern.matches(&e.key)),
            Backing::SlidingTtl(cache) => cache.iter().any(|(_, e)| pattern.matches(&e.key)),
        }
    }

    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Bounded { entries, .. } => entries.len(),
            Backing::SlidingTtl(cache) => cache.entry_count() as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            raised: self.counters.raised.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            sensed: self.counters.sensed.load(Ordering::Relaxed),
            len: self.len(),
        }
    }

    pub fn last_overflow(&self) -> Option<SinkOverflow> {
        let capacity = match &self.backing {
            Backing::Bounded { capacity, .. } => *capacity,
            Backing::SlidingTtl(cache) => cache.policy().max_capacity().unwrap_or(u64::MAX) as usize,
        };
        if self.counters.dropped.load(Ordering::Relaxed) > 0 {
            Some(SinkOverflow { capacity })
        } else {
            None
        }
    }
}

/// Convenience alias for the common case of sharing a sink across tasks.
pub type SharedSink = Arc<SignalSink>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_then_sense_sees_entry() {
        let sink = SignalSink::operation_scoped();
        sink.raise("transport.is_streaming", true, "tcp_fingerprint");
        let found = sink.sense_latest("transport.*").expect("entry present");
        assert_eq!(found.key, SignalKey::new("transport.is_streaming"));
        assert_eq!(found.payload.as_bool(), Some(true));
    }

    #[test]
    fn sense_is_newest_first() {
        let sink = SignalSink::operation_scoped();
        sink.raise("ua.token", 1i64, "ua_scan");
        sink.raise("ua.token", 2i64, "ua_scan");
        sink.raise("ua.token", 3i64, "ua_scan");
        let all = sink.sense("ua.token");
        let values: Vec<i64> = all.iter().map(|e| e.payload.as_i64().unwrap()).collect();
        assert_eq!(values, vec![3, 2, 1]);
    }

    #[test]
    fn bounded_capacity_evicts_oldest_and_counts_drop() {
        let sink = SignalSink::operation_scoped_with_capacity(3);
        for i in 0..5i64 {
            sink.raise("x.y", i, "d");
        }
        assert_eq!(sink.len(), 3);
        let values: Vec<i64> =
            sink.sense("x.y").into_iter().map(|e| e.payload.as_i64().unwrap()).collect();
        // newest three survive
        assert_eq!(values, vec![4, 3, 2]);
        assert_eq!(sink.stats().dropped, 2);
    }

    #[test]
    fn has_match_without_materialising() {
        let sink = SignalSink::operation_scoped();
        assert!(!sink.has_match("response.**"));
        sink.raise("response.status", 200i64, "response_analyzer");
        assert!(sink.has_match("response.**"));
    }
}
