//! Process-scoped tracking of per-signature request behavior across
//! time: path entropy, timing regularity, and rolling bot-probability
//! average, surfaced as aberration signals on the global sink.

mod atom;
mod config;
mod coordinator;
mod queue;

pub use atom::{BehaviorSnapshot, RequestSummary};
pub use config::CoordinatorConfig;
pub use coordinator::SignatureCoordinator;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bot_detect_signal::SignalSink;

    use super::*;

    fn summary(request_id: &str, path: &str, bot_probability: f64, epoch_millis: i64) -> RequestSummary {
        RequestSummary { request_id: request_id.to_string(), path: path.to_string(), bot_probability, epoch_millis }
    }

    #[tokio::test]
    async fn query_before_any_record_is_none() {
        let coordinator = SignatureCoordinator::new(Arc::new(SignalSink::global()));
        assert!(coordinator.query("nobody").is_none());
    }

    #[tokio::test]
    async fn repeated_high_risk_regular_traffic_becomes_aberrant() {
        let sink = Arc::new(SignalSink::global());
        let coordinator = SignatureCoordinator::new(sink.clone());

        for i in 0..6 {
            coordinator.record_async("sig-1", summary(&format!("req-{i}"), "/api/x", 0.9, i * 500));
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        // give the shard task a moment to drain
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let snapshot = coordinator.query("sig-1").expect("signature tracked");
        assert!(snapshot.sample_size >= 5);
        assert!(snapshot.avg_bot_probability > 0.6);
    }

    #[tokio::test]
    async fn distinct_signatures_do_not_share_state() {
        let coordinator = SignatureCoordinator::new(Arc::new(SignalSink::global()));
        coordinator.record_async("sig-a", summary("req-a", "/a", 0.1, 0));
        coordinator.record_async("sig-b", summary("req-b", "/b", 0.9, 0));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let a = coordinator.query("sig-a").expect("sig-a tracked");
        let b = coordinator.query("sig-b").expect("sig-b tracked");
        assert!((a.avg_bot_probability - 0.1).abs() < 1e-9);
        assert!((b.avg_bot_probability - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn recording_the_same_request_id_twice_is_idempotent() {
        let coordinator = SignatureCoordinator::new(Arc::new(SignalSink::global()));
        coordinator.record_async("sig-dup", summary("req-1", "/a", 0.9, 0));
        coordinator.record_async("sig-dup", summary("req-1", "/a", 0.9, 0));
        coordinator.record_async("sig-dup", summary("req-1", "/a", 0.9, 0));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let snapshot = coordinator.query("sig-dup").expect("signature tracked");
        assert_eq!(snapshot.sample_size, 1);
    }

    #[tokio::test]
    async fn a_full_shard_drops_the_oldest_pending_update_for_the_same_signature() {
        let sink = Arc::new(SignalSink::operation_scoped());
        let mut config = CoordinatorConfig::default();
        config.queue_shards = 1;
        config.shard_queue_capacity = 2;
        let coordinator = SignatureCoordinator::with_config(sink.clone(), config);

        // Three updates for the same signature queued faster than the
        // single worker can drain them should overflow a capacity-2
        // shard and evict the oldest of the three, not panic or grow.
        coordinator.record_async("sig-hot", summary("req-1", "/a", 0.9, 0));
        coordinator.record_async("sig-hot", summary("req-2", "/a", 0.9, 1));
        coordinator.record_async("sig-hot", summary("req-3", "/a", 0.9, 2));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(coordinator.dropped_update_count() >= 1);
        assert!(sink.has_match("coordinator.backpressure"));
    }
}
