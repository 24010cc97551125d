use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::core::breaker::{BreakerResetResponse, GroupBreakerStates};
use crate::core::feed::{LogFilter, RetriedFilter};
use crate::core::model::LogRecord;
use crate::core::ports::backend::{BackendError, BreakerBackend, LogBackend};

/// HTTP client for the relay backend's admin API (`/api/v1`). One instance
/// serves both the log feed and the circuit-breaker surface; reqwest pools
/// connections underneath.
pub struct HttpBackend {
    client: reqwest::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct StreamTokenResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct ResetBreakerRequest<'a> {
    channel_id: i64,
    model_name: &'a str,
}

fn list_query(page: u64, page_size: usize, filter: &LogFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("page", page.to_string()),
        ("page_size", page_size.to_string()),
    ];
    if let Some(group) = &filter.group {
        query.push(("group", group.clone()));
    }
    if let Some(model) = &filter.model {
        query.push(("model", model.clone()));
    }
    if let Some(channel) = &filter.channel {
        query.push(("channel", channel.clone()));
    }
    match filter.retried {
        RetriedFilter::All => {}
        RetriedFilter::Retried => query.push(("retried", "true".to_string())),
        RetriedFilter::NotRetried => query.push(("retried", "false".to_string())),
    }
    query
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            BackendError::Decode(error.to_string())
        } else {
            BackendError::Transport(error.to_string())
        }
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("{}/api/v1", base_url.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn list(
        &self,
        page: u64,
        page_size: usize,
        filter: &LogFilter,
    ) -> Result<Vec<LogRecord>, BackendError> {
        let response = self
            .client
            .get(self.url("/log/list"))
            .query(&list_query(page, page_size, filter))
            .send()
            .await?;
        let response = error_for_status(response).await?;
        // The backend serializes an empty result set as null.
        let records: Option<Vec<LogRecord>> = response.json().await?;
        Ok(records.unwrap_or_default())
    }

    async fn token(&self) -> Result<String, BackendError> {
        let response = self.client.get(self.url("/log/stream-token")).send().await?;
        let response = error_for_status(response).await?;
        let body: StreamTokenResponse = response.json().await?;
        Ok(body.token)
    }

    async fn clear(&self) -> Result<(), BackendError> {
        let response = self.client.delete(self.url("/log/clear")).send().await?;
        error_for_status(response).await?;
        Ok(())
    }

    async fn states(&self, group_id: i64) -> Result<GroupBreakerStates, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/circuit-breaker/group/{}/states", group_id)))
            .send()
            .await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }

    async fn reset(
        &self,
        channel_id: i64,
        model_name: &str,
    ) -> Result<BreakerResetResponse, BackendError> {
        let response = self
            .client
            .post(self.url("/circuit-breaker/item/reset"))
            .json(&ResetBreakerRequest {
                channel_id,
                model_name,
            })
            .send()
            .await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }
}

impl LogBackend for HttpBackend {
    fn list_logs<'a>(
        &'a self,
        page: u64,
        page_size: usize,
        filter: &'a LogFilter,
    ) -> BoxFuture<'a, Result<Vec<LogRecord>, BackendError>> {
        Box::pin(self.list(page, page_size, filter))
    }

    fn stream_token(&self) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(self.token())
    }

    fn clear_logs(&self) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(self.clear())
    }
}

impl BreakerBackend for HttpBackend {
    fn breaker_states(
        &self,
        group_id: i64,
    ) -> BoxFuture<'_, Result<GroupBreakerStates, BackendError>> {
        Box::pin(self.states(group_id))
    }

    fn reset_breaker<'a>(
        &'a self,
        channel_id: i64,
        model_name: &'a str,
    ) -> BoxFuture<'a, Result<BreakerResetResponse, BackendError>> {
        Box::pin(self.reset(channel_id, model_name))
    }
}
