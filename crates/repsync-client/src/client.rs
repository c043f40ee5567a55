//! Low-level HTTP plumbing shared by the API modules.

use crate::api::*;
use repsync_core::{Result, SyncError};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for talking to directory and replica nodes.
///
/// Unlike a single-backend API client there is no fixed base URL: every
/// call names its destination endpoint, since probes and syncs fan out to
/// whatever secondaries the current cycle's assignments reference.
#[derive(Clone)]
pub struct NodeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
}

impl Default for NodeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeClient {
    /// Create a client with default settings
    #[must_use]
    pub fn new() -> Self {
        NodeClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> NodeClientBuilder {
        NodeClientBuilder::new()
    }

    /// Access the directory (assignment) endpoints
    #[must_use]
    pub fn directory(&self) -> DirectoryApi<'_> {
        DirectoryApi::new(self)
    }

    /// Access clock-probe endpoints
    #[must_use]
    pub fn clocks(&self) -> ClockApi<'_> {
        ClockApi::new(self)
    }

    /// Access sync dispatch and status endpoints
    #[must_use]
    pub fn sync(&self) -> SyncApi<'_> {
        SyncApi::new(self)
    }

    /// Perform a GET request with query parameters against an endpoint
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = build_url(endpoint, path)?;
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        handle_response(response).await
    }

    /// Perform a POST request with a JSON body against an endpoint
    pub(crate) async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        endpoint: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = build_url(endpoint, path)?;
        debug!(url = %url, "POST request");

        let response = self
            .inner
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        handle_response(response).await
    }

    /// POST where only the status matters
    pub(crate) async fn post_accepted<B: serde::Serialize>(
        &self,
        endpoint: &str,
        path: &str,
        body: &B,
    ) -> Result<()> {
        let url = build_url(endpoint, path)?;
        debug!(url = %url, "POST request");

        let response = self
            .inner
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::Http(format!("{path} returned {status}")))
        }
    }
}

/// Join an endpoint base with a request path, validating the base
fn build_url(endpoint: &str, path: &str) -> Result<url::Url> {
    let base = url::Url::parse(endpoint)
        .map_err(|e| SyncError::Http(format!("invalid endpoint {endpoint}: {e}")))?;
    base.join(path)
        .map_err(|e| SyncError::Http(format!("invalid path {path}: {e}")))
}

/// Handle a response that carries a JSON body
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;
        serde_json::from_str(&body).map_err(SyncError::Json)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Http(format!("status {status}: {body}")))
    }
}

/// Builder for configuring a [`NodeClient`]
pub struct NodeClientBuilder {
    timeout: Duration,
    user_agent: String,
}

impl Default for NodeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeClientBuilder {
    /// Create a new builder with defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("repsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    #[must_use]
    pub fn build(self) -> NodeClient {
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client");

        NodeClient {
            inner: Arc::new(ClientInner { http }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_path() {
        let url = build_url("http://cn2.example.com", "/sync_status/0xabc").unwrap();
        assert_eq!(url.as_str(), "http://cn2.example.com/sync_status/0xabc");
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        assert!(build_url("not a url", "/sync").is_err());
    }
}
