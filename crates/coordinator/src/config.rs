use std::time::Duration;

/// Tunables for [`crate::SignatureCoordinator`], defaulted per spec.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub signature_window: Duration,
    pub max_requests_per_signature: usize,
    pub min_requests_for_aberration: usize,
    pub aberration_score_threshold: f64,
    pub signature_ttl: Duration,
    pub max_signatures_in_window: u64,
    /// How many shards the keyed-sequential update queue fans out
    /// across. Updates for the same signature always land on the same
    /// shard, so they serialize; different signatures usually land on
    /// different shards and run in parallel.
    pub queue_shards: usize,
    /// Hard bound on how many updates may sit pending in one shard at
    /// once. Past this, enqueuing evicts the oldest pending update for
    /// the same signature (falling back to the shard's oldest entry if
    /// none match) and raises `CoordinatorBackpressure`.
    pub shard_queue_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            signature_window: Duration::from_secs(15 * 60),
            max_requests_per_signature: 100,
            min_requests_for_aberration: 5,
            aberration_score_threshold: 0.7,
            signature_ttl: Duration::from_secs(30 * 60),
            max_signatures_in_window: 1000,
            queue_shards: num_cpus::get().max(1),
            shard_queue_capacity: 256,
        }
    }
}
