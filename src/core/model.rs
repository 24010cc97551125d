use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single channel attempt during relay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Failed,
    CircuitBreak,
    Skipped,
}

/// One channel attempt recorded while relaying a request. Attempts beyond
/// the first mean the relay had to retry or fail over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelAttempt {
    pub channel_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_key_id: Option<i64>,
    pub channel_name: String,
    pub model_name: String,
    pub attempt_num: u32,
    pub status: AttemptStatus,
    pub duration: i64,
    #[serde(default)]
    pub sticky: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// A relay log entry as served by the backend, over both the paginated list
/// endpoint and the push stream. `id` is a snowflake: globally unique and
/// monotonic with creation order, but push delivery makes no ordering
/// promise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub id: i64,
    /// Seconds since epoch. Display and ordering key.
    pub time: i64,
    pub request_model_name: String,
    #[serde(rename = "channel")]
    pub channel_id: i64,
    pub channel_name: String,
    pub actual_model_name: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub ftut: i64,
    pub use_time: i64,
    pub cost: f64,
    pub request_content: String,
    pub response_content: String,
    pub error: String,
    #[serde(default)]
    pub attempts: Vec<ChannelAttempt>,
    #[serde(default)]
    pub total_attempts: u32,
}

impl LogRecord {
    /// Whether the relay needed more than one attempt. The backend reports
    /// `total_attempts` separately from the attempt list and the two can
    /// disagree on truncated rows, so take the larger.
    pub fn was_retried(&self) -> bool {
        self.total_attempts.max(self.attempts.len() as u32) > 1
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }
}
