//! Sync dispatch and convergence-status endpoints.

use crate::NodeClient;
use repsync_core::{ClockValue, Result, SyncError, Wallet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct SyncRequest<'a> {
    // The secondary's sync endpoint accepts a batch; the engine always
    // dispatches one wallet at a time.
    wallet: [&'a Wallet; 1],
    creator_node_endpoint: &'a str,
    state_machine: bool,
}

#[derive(Debug, Deserialize)]
struct SyncStatusEnvelope {
    data: SyncStatus,
}

#[derive(Debug, Deserialize)]
struct SyncStatus {
    #[serde(rename = "clockValue")]
    clock_value: i64,
}

/// Sync dispatch and status endpoints
pub struct SyncApi<'a> {
    client: &'a NodeClient,
}

impl<'a> SyncApi<'a> {
    pub(crate) fn new(client: &'a NodeClient) -> Self {
        Self { client }
    }

    /// Instruct `target_endpoint` to pull and apply the primary's current
    /// state for `wallet`.
    ///
    /// Tagged `state_machine: true` so the secondary can distinguish
    /// machine-initiated reconciliation from user-triggered syncs.
    pub async fn dispatch(
        &self,
        target_endpoint: &str,
        wallet: &Wallet,
        source_endpoint: &str,
    ) -> Result<()> {
        self.client
            .post_accepted(
                target_endpoint,
                "/sync",
                &SyncRequest {
                    wallet: [wallet],
                    creator_node_endpoint: source_endpoint,
                    state_machine: true,
                },
            )
            .await
            .map_err(|e| SyncError::Dispatch {
                endpoint: target_endpoint.to_string(),
                message: e.to_string(),
            })
    }

    /// Read the clock the target currently reports for `wallet`.
    ///
    /// Secondaries commonly answer with an error mid-sync; callers treat
    /// any failure here as "not yet converged".
    pub async fn status(
        &self,
        target_endpoint: &str,
        wallet: &Wallet,
    ) -> Result<Option<ClockValue>> {
        let envelope: SyncStatusEnvelope = self
            .client
            .get(target_endpoint, &format!("/sync_status/{wallet}"), &[])
            .await?;

        Ok(ClockValue::from_wire(envelope.data.clock_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_dispatch_sends_machine_initiated_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sync"))
            .and(body_json(serde_json::json!({
                "wallet": ["0xaa"],
                "creator_node_endpoint": "http://cn1",
                "state_machine": true
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = NodeClient::new();
        client
            .sync()
            .dispatch(&server.uri(), &Wallet::new("0xaa"), "http://cn1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_rejection_is_dispatch_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sync"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let err = client
            .sync()
            .dispatch(&server.uri(), &Wallet::new("0xaa"), "http://cn1")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Dispatch { .. }));
    }

    #[tokio::test]
    async fn test_status_reads_clock_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sync_status/0xaa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"clockValue": 7}
            })))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let clock = client
            .sync()
            .status(&server.uri(), &Wallet::new("0xaa"))
            .await
            .unwrap();
        assert_eq!(clock, Some(ClockValue(7)));
    }

    #[tokio::test]
    async fn test_status_midsync_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sync_status/0xaa"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let err = client
            .sync()
            .status(&server.uri(), &Wallet::new("0xaa"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Http(_)));
    }
}
