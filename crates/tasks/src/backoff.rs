use bridge_metrics::BackoffMetrics;
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Process-wide rate-limit gate. Any component that observes a rate-limit
/// response calls [`BackoffCoordinator::trigger`]; every outbound network
/// caller calls [`BackoffCoordinator::wait`] before issuing a request. The
/// deadline only ever moves forward, so a flurry of 429s from different
/// workers converges on the single latest deadline rather than thrashing.
#[derive(Clone)]
pub struct BackoffCoordinator {
    /// Millisecond epoch deadline. `0` means "no active backoff".
    deadline_ms: Arc<AtomicI64>,
    metrics: BackoffMetrics,
}

impl std::fmt::Debug for BackoffCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffCoordinator").field("deadline_ms", &self.deadline_ms.load(Ordering::Relaxed)).finish()
    }
}

impl Default for BackoffCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffCoordinator {
    pub fn new() -> Self {
        Self { deadline_ms: Arc::new(AtomicI64::new(0)), metrics: BackoffMetrics::default() }
    }

    /// Push the shared deadline to `max(current, now + retry_after)`. Never
    /// moves the deadline earlier.
    pub fn trigger(&self, retry_after: Duration) {
        let candidate = now_ms() + retry_after.as_millis() as i64;
        let mut current = self.deadline_ms.load(Ordering::SeqCst);
        loop {
            if candidate <= current {
                return;
            }
            match self.deadline_ms.compare_exchange_weak(current, candidate, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => {
                    self.metrics.triggers_total.increment(1);
                    tracing::warn!(target: "backoff", deadline_ms = candidate, "shared backoff deadline extended");
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Block until `now >= deadline`, plus a random 0-2s jitter, then
    /// return. A no-op if no backoff is currently active.
    pub async fn wait(&self) {
        let deadline = self.deadline_ms.load(Ordering::SeqCst);
        let remaining = deadline - now_ms();
        self.metrics.deadline_remaining_ms.set(remaining.max(0) as f64);
        if remaining <= 0 {
            return;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=2000);
        tokio::time::sleep(Duration::from_millis(remaining as u64 + jitter_ms)).await;
    }
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_is_monotone() {
        let coordinator = BackoffCoordinator::new();
        coordinator.trigger(Duration::from_secs(10));
        let after_first = coordinator.deadline_ms.load(Ordering::SeqCst);
        coordinator.trigger(Duration::from_secs(1));
        let after_second = coordinator.deadline_ms.load(Ordering::SeqCst);
        assert_eq!(after_first, after_second, "a shorter retry_after must not move the deadline earlier");
    }

    #[tokio::test]
    async fn wait_returns_immediately_with_no_backoff() {
        let coordinator = BackoffCoordinator::new();
        let start = std::time::Instant::now();
        coordinator.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
