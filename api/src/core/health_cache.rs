//! Short-lived memo of the provider health snapshot.

use std::future::Future;
use std::time::Duration;

use ai_llm_service::HealthStatus;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

/// How long one round of provider probes is reused.
pub const HEALTH_TTL: Duration = Duration::from_secs(30);

/// Holds the last probe round. Concurrent callers share one refresh.
pub struct HealthCache {
    ttl: Duration,
    snapshot: Mutex<Option<(Instant, Vec<HealthStatus>)>>,
}

impl HealthCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            snapshot: Mutex::new(None),
        }
    }

    /// Returns the cached snapshot, running `probe` when it is missing or stale.
    pub async fn get_or_refresh<F, Fut>(&self, probe: F) -> Vec<HealthStatus>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<HealthStatus>>,
    {
        let mut slot = self.snapshot.lock().await;
        if let Some((taken, statuses)) = slot.as_ref() {
            if taken.elapsed() < self.ttl {
                debug!(age_ms = taken.elapsed().as_millis() as u64, "health snapshot reused");
                return statuses.clone();
            }
        }
        let fresh = probe().await;
        *slot = Some((Instant::now(), fresh.clone()));
        fresh
    }
}
