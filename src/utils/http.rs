//! HTTP client with retry for API queries and PDF downloads.

use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;

use super::retry::{with_retry, RetryConfig};
use crate::error::ArxivError;

/// Default `User-Agent` sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client that retries transient failures
///
/// Transport errors and non-2xx statuses count as transient and are retried
/// according to the [`RetryConfig`]. The client holds no per-call state.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(user_agent: &str, retry: RetryConfig) -> Result<Self, ArxivError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ArxivError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            retry,
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// GET `url` with query `params` and return the response body as text
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, ArxivError> {
        with_retry(self.retry, move || async move {
            let response = self.send(url, params, timeout).await?;
            response.text().await.map_err(ArxivError::from)
        })
        .await
    }

    /// GET `url` and hand back the response with its body still unread
    ///
    /// Only establishing the response is retried. `timeout` bounds the whole
    /// exchange including reading the body.
    pub async fn get_stream(&self, url: &str, timeout: Duration) -> Result<Response, ArxivError> {
        with_retry(self.retry, move || self.send(url, &[], timeout)).await
    }

    async fn send(
        &self,
        url: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Response, ArxivError> {
        let mut request = self.client.get(url).timeout(timeout);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArxivError::Network(format!("HTTP {} from {}", status, url)));
        }
        Ok(response)
    }
}
