use std::time::{Duration, Instant};

use super::BreakerItem;

/// Poll cadence while any breaker was recently hot.
const HOT_INTERVAL: Duration = Duration::from_secs(5);
/// Poll cadence for a quiescent system.
const IDLE_INTERVAL: Duration = Duration::from_secs(15);
/// How long a hot observation keeps the fast cadence.
const HOT_WINDOW: Duration = Duration::from_secs(120);

/// Adaptive poll scheduler: polls fast while breakers are (or were recently)
/// in a non-quiescent state, slow otherwise. The only state carried between
/// polls is the time of the last hot observation.
#[derive(Debug, Default)]
pub struct PollScheduler {
    last_hot_at: Option<Instant>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one poll response. Any open or half-open item refreshes the
    /// hot window.
    pub fn observe(&mut self, items: &[BreakerItem], now: Instant) {
        if items.iter().any(|item| item.state.is_hot()) {
            self.last_hot_at = Some(now);
        }
    }

    /// Delay until the next poll, evaluated at `now`.
    pub fn next_delay(&self, now: Instant) -> Duration {
        match self.last_hot_at {
            Some(last_hot_at) if now < last_hot_at + HOT_WINDOW => HOT_INTERVAL,
            _ => IDLE_INTERVAL,
        }
    }
}
