use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Notify;

use bot_detect_identity::Signature;

use crate::atom::RequestSummary;
use crate::coordinator::Inner;

pub(crate) struct Update {
    pub signature: Signature,
    pub summary: RequestSummary,
}

struct Shard {
    pending: StdMutex<VecDeque<Update>>,
    notify: Notify,
    capacity: usize,
}

/// Keyed-sequential update queue: one bounded shard per worker, each
/// drained by its own task. A signature always hashes to the same
/// shard, so its updates process strictly in order; different
/// signatures usually land on different shards and run in parallel.
///
/// Each shard is capped at `capacity` pending updates. Past that, the
/// incoming update evicts the oldest pending update for the *same*
/// signature if one is queued, so one noisy signature can't starve the
/// others out of the shard; if none match, it falls back to evicting
/// the shard's oldest entry overall. Either way the eviction raises a
/// `CoordinatorBackpressure` signal and bumps the dropped-update
/// counter. Mirrors the teacher's `persist_worker`/`afad_worker`
/// consumer-loop shape, fanned out across N bounded shards instead of
/// one unbounded one.
pub(crate) struct UpdateQueue {
    shards: Vec<Arc<Shard>>,
}

impl UpdateQueue {
    pub fn spawn(shards: usize, capacity: usize, inner: Arc<Inner>) -> Self {
        let shard_count = shards.max(1);
        let capacity = capacity.max(1);
        let mut owned = Vec::with_capacity(shard_count);
        for shard_id in 0..shard_count {
            let shard = Arc::new(Shard { pending: StdMutex::new(VecDeque::new()), notify: Notify::new(), capacity });
            let worker_shard = shard.clone();
            let worker_inner = inner.clone();
            tokio::spawn(async move {
                loop {
                    let next = worker_shard.pending.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                    match next {
                        Some(update) => worker_inner.apply_update(update),
                        None => worker_shard.notify.notified().await,
                    }
                }
            });
            tracing::trace!(shard_id, capacity, "coordinator update shard started");
            owned.push(shard);
        }
        Self { shards: owned }
    }

    pub fn enqueue(&self, update: Update, inner: &Inner) {
        let shard = &self.shards[Self::shard_for(&update.signature, self.shards.len())];
        let mut guard = shard.pending.lock().unwrap_or_else(|e| e.into_inner());

        if guard.len() >= shard.capacity {
            let evict_at = guard.iter().position(|pending| pending.signature == update.signature);
            let evicted = match evict_at {
                Some(idx) => guard.remove(idx),
                None => guard.pop_front(),
            };
            if let Some(evicted) = evicted {
                inner.raise_backpressure(&evicted.signature);
            }
        }

        guard.push_back(update);
        drop(guard);
        shard.notify.notify_one();
    }

    fn shard_for(signature: &str, shards: usize) -> usize {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        signature.hash(&mut hasher);
        (hasher.finish() as usize) % shards.max(1)
    }
}
