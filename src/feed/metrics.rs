use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one controller.
///
/// Clones share the same counters, so the worker and the controller hold
/// the same tracker.
#[derive(Clone, Default)]
pub struct FeedMetrics {
    connect_attempts: Arc<AtomicU64>,
    opens: Arc<AtomicU64>,
    messages_received: Arc<AtomicU64>,
    batches_applied: Arc<AtomicU64>,
    parse_errors: Arc<AtomicU64>,
    records_without_position: Arc<AtomicU64>,
    records_rejected: Arc<AtomicU64>,
    server_errors: Arc<AtomicU64>,
    fallback_fetches: Arc<AtomicU64>,
    fallback_failures: Arc<AtomicU64>,

    /// Millis since epoch of the last inbound message (0 = never)
    last_message_ms: Arc<AtomicI64>,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.last_message_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Record an applied batch and its unusable records
    pub fn record_batch(&self, without_position: usize, rejected: usize) {
        self.batches_applied.fetch_add(1, Ordering::Relaxed);
        self.records_without_position
            .fetch_add(without_position as u64, Ordering::Relaxed);
        self.records_rejected
            .fetch_add(rejected as u64, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_failure(&self) {
        self.fallback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let last_ms = self.last_message_ms.load(Ordering::Relaxed);
        MetricsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            opens: self.opens.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            batches_applied: self.batches_applied.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            records_without_position: self.records_without_position.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            fallback_fetches: self.fallback_fetches.load(Ordering::Relaxed),
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
            last_message_at: if last_ms == 0 {
                None
            } else {
                DateTime::from_timestamp_millis(last_ms)
            },
        }
    }
}

/// Snapshot of feed metrics at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub connect_attempts: u64,
    pub opens: u64,
    pub messages_received: u64,
    pub batches_applied: u64,
    pub parse_errors: u64,
    pub records_without_position: u64,
    pub records_rejected: u64,
    pub server_errors: u64,
    pub fallback_fetches: u64,
    pub fallback_failures: u64,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counters() {
        let metrics = FeedMetrics::new();
        assert!(metrics.get_snapshot().last_message_at.is_none());

        metrics.record_connect_attempt();
        metrics.record_connect_attempt();
        metrics.record_open();
        metrics.record_message();
        metrics.record_batch(2, 1);
        metrics.record_parse_error();
        metrics.record_fallback();
        metrics.record_fallback_failure();

        let snapshot = metrics.get_snapshot();
        assert_eq!(snapshot.connect_attempts, 2);
        assert_eq!(snapshot.opens, 1);
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.batches_applied, 1);
        assert_eq!(snapshot.records_without_position, 2);
        assert_eq!(snapshot.records_rejected, 1);
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.server_errors, 0);
        assert_eq!(snapshot.fallback_fetches, 1);
        assert_eq!(snapshot.fallback_failures, 1);
        assert!(snapshot.last_message_at.is_some());
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = FeedMetrics::new();
        let clone = metrics.clone();
        clone.record_server_error();
        assert_eq!(metrics.get_snapshot().server_errors, 1);
    }

    #[test]
    fn test_concurrent_access() {
        let metrics = FeedMetrics::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let metrics = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    metrics.record_message();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.get_snapshot().messages_received, 1000);
    }
}
