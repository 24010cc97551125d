use futures::future::BoxFuture;
use thiserror::Error;

use crate::core::breaker::{BreakerResetResponse, GroupBreakerStates};
use crate::core::feed::LogFilter;
use crate::core::model::LogRecord;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-level failure: the request never produced a usable response.
    #[error("request failed: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),
}

/// REST surface of the log backend. Errors are returned to the caller;
/// retrying is the caller's decision, never automatic.
pub trait LogBackend: Send + Sync {
    /// Fetch one historical page. An absent filter clause means unfiltered
    /// on that dimension; a page past the end returns an empty vec.
    fn list_logs<'a>(
        &'a self,
        page: u64,
        page_size: usize,
        filter: &'a LogFilter,
    ) -> BoxFuture<'a, Result<Vec<LogRecord>, BackendError>>;

    /// Request a single-use, short-lived token for opening the push stream.
    fn stream_token(&self) -> BoxFuture<'_, Result<String, BackendError>>;

    /// Clear the server-side log history.
    fn clear_logs(&self) -> BoxFuture<'_, Result<(), BackendError>>;
}

/// Circuit-breaker surface of the backend.
pub trait BreakerBackend: Send + Sync {
    fn breaker_states(
        &self,
        group_id: i64,
    ) -> BoxFuture<'_, Result<GroupBreakerStates, BackendError>>;

    fn reset_breaker<'a>(
        &'a self,
        channel_id: i64,
        model_name: &'a str,
    ) -> BoxFuture<'a, Result<BreakerResetResponse, BackendError>>;
}
