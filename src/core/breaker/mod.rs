mod monitor;
mod scheduler;

pub use monitor::{BreakerCache, BreakerMonitor};
pub use scheduler::PollScheduler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    /// Open and half-open breakers are "hot": the poll loop tightens its
    /// cadence while any are present.
    pub fn is_hot(self) -> bool {
        matches!(self, BreakerState::Open | BreakerState::HalfOpen)
    }
}

/// Snapshot of one (channel, model) breaker. Created and updated only by
/// backend polls; replaced wholesale per response, never mutated locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakerItem {
    pub group_id: i64,
    pub group_name: String,
    pub channel_id: i64,
    pub channel_name: String,
    pub model_name: String,
    pub breaker_key: String,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub trip_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trip_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_until: Option<String>,
    #[serde(default)]
    pub open_remaining_second: i64,
    pub probe_in_flight: bool,
}

impl BreakerItem {
    pub fn open_until_time(&self) -> Option<DateTime<Utc>> {
        self.open_until
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupBreakerStates {
    pub group_id: i64,
    pub group_name: String,
    #[serde(default)]
    pub items: Vec<BreakerItem>,
}

impl GroupBreakerStates {
    pub fn has_hot_state(&self) -> bool {
        self.items.iter().any(|item| item.state.is_hot())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakerResetResponse {
    pub affected_breakers: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaker_key: Option<String>,
}
