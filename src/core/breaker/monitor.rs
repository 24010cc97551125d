use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::scheduler::PollScheduler;
use super::{BreakerResetResponse, GroupBreakerStates};
use crate::core::ports::backend::{BackendError, BreakerBackend};

/// Last known breaker picture for the group. `snapshot` is `None` before
/// the first successful poll and while a reset has made the cached states
/// stale.
#[derive(Debug, Clone, Default)]
pub struct BreakerCache {
    pub snapshot: Option<GroupBreakerStates>,
    pub last_error: Option<String>,
}

/// Polls one group's circuit-breaker states on the adaptive cadence and
/// caches the latest response wholesale. Resets mark the cache stale and
/// force an immediate re-poll instead of waiting out the current delay.
pub struct BreakerMonitor {
    backend: Arc<dyn BreakerBackend>,
    group_id: i64,
    cache: Mutex<BreakerCache>,
    refresh: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BreakerMonitor {
    pub fn new(backend: Arc<dyn BreakerBackend>, group_id: i64) -> Arc<Self> {
        Arc::new(Self {
            backend,
            group_id,
            cache: Mutex::new(BreakerCache::default()),
            refresh: Notify::new(),
            task: Mutex::new(None),
        })
    }

    /// Start the poll loop, replacing a previous one if running.
    pub fn start(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        let task = tokio::spawn(async move { monitor.poll_loop().await });
        let mut slot = self.task.lock().expect("task lock poisoned");
        if let Some(old) = slot.replace(task) {
            old.abort();
        }
    }

    pub fn stop(&self) {
        let mut slot = self.task.lock().expect("task lock poisoned");
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    pub fn state(&self) -> BreakerCache {
        self.cache.lock().expect("cache lock poisoned").clone()
    }

    /// Reset one (channel, model) breaker on the backend. All cached state
    /// is stale after a reset, so the snapshot is dropped and the loop is
    /// kicked into an immediate full re-poll.
    pub async fn reset_one(
        &self,
        channel_id: i64,
        model_name: &str,
    ) -> Result<BreakerResetResponse, BackendError> {
        let response = self.backend.reset_breaker(channel_id, model_name).await?;
        self.cache.lock().expect("cache lock poisoned").snapshot = None;
        self.refresh.notify_one();
        Ok(response)
    }

    async fn poll_loop(&self) {
        let mut scheduler = PollScheduler::new();
        loop {
            match self.backend.breaker_states(self.group_id).await {
                Ok(states) => {
                    scheduler.observe(&states.items, now());
                    let mut cache = self.cache.lock().expect("cache lock poisoned");
                    cache.snapshot = Some(states);
                    cache.last_error = None;
                }
                Err(error) => {
                    log::warn!("breaker state poll failed: {}", error);
                    self.cache.lock().expect("cache lock poisoned").last_error =
                        Some(error.to_string());
                }
            }

            let delay = scheduler.next_delay(now());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.refresh.notified() => {}
            }
        }
    }
}

impl Drop for BreakerMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

// Same clock the sleep timers run on.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
