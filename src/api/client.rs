use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{ComparisonForm, ComparisonResult, ErrorBody, HistoryResponse};
use super::{ApiError, DashboardApi};
use crate::history::HistoryQuery;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

const HISTORY_PATH: &str = "/api/historico";
const COMPARISON_PATH: &str = "/api/comparar-aporte-mensal";

/// HTTP client for the indicators backend.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: Client,
    base_url: String,
}

impl DashboardClient {
    /// Creates a client with a default HTTP client and no request deadline.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a client around a custom reqwest client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url.into()),
        }
    }

    /// Creates a client that gives up on requests after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Decode a 2xx body as `T`, or turn the response into [`ApiError::Status`]
/// carrying the server's `error` message when it sent one.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }

    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty());
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl DashboardApi for DashboardClient {
    async fn fetch_history(&self, query: &HistoryQuery) -> Result<HistoryResponse, ApiError> {
        let params = query.query_params();
        debug!(?params, "GET {HISTORY_PATH}");

        let response = self
            .client
            .get(self.url(HISTORY_PATH))
            .query(&params)
            .send()
            .await?;
        read_json(response).await
    }

    async fn compare_monthly_contribution(
        &self,
        form: &ComparisonForm,
    ) -> Result<ComparisonResult, ApiError> {
        debug!(fields = form.fields().count(), "POST {COMPARISON_PATH}");

        let response = self
            .client
            .post(self.url(COMPARISON_PATH))
            .json(form)
            .send()
            .await?;
        read_json(response).await
    }
}
