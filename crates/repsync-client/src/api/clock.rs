//! Batched clock probes against secondary replicas.

use crate::NodeClient;
use repsync_core::{ClockValue, Result, SyncError, Wallet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
struct BatchClockRequest<'a> {
    #[serde(rename = "walletPublicKeys")]
    wallet_public_keys: &'a [Wallet],
}

#[derive(Debug, Deserialize)]
struct BatchClockResponse {
    users: Vec<UserClockEntry>,
}

#[derive(Debug, Deserialize)]
struct UserClockEntry {
    #[serde(rename = "walletPublicKey")]
    wallet_public_key: Wallet,
    clock: i64,
}

/// Clock-probe endpoints
pub struct ClockApi<'a> {
    client: &'a NodeClient,
}

impl<'a> ClockApi<'a> {
    pub(crate) fn new(client: &'a NodeClient) -> Self {
        Self { client }
    }

    /// Query one secondary for the clock values of many wallets in a
    /// single request.
    ///
    /// Wallets the secondary has no record of are simply absent from the
    /// returned map (unknown). Request volume is therefore bounded by the
    /// number of distinct secondaries, not by user count.
    pub async fn batch_status(
        &self,
        secondary_endpoint: &str,
        wallets: &[Wallet],
    ) -> Result<HashMap<Wallet, ClockValue>> {
        let response: BatchClockResponse = self
            .client
            .post(
                secondary_endpoint,
                "/users/batch_clock_status",
                &BatchClockRequest {
                    wallet_public_keys: wallets,
                },
            )
            .await
            .map_err(|e| SyncError::ClockProbe {
                endpoint: secondary_endpoint.to_string(),
                message: e.to_string(),
            })?;

        Ok(response
            .users
            .into_iter()
            .filter_map(|entry| {
                ClockValue::from_wire(entry.clock).map(|clock| (entry.wallet_public_key, clock))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_batch_status_maps_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/batch_clock_status"))
            .and(body_json(serde_json::json!({
                "walletPublicKeys": ["0xaa", "0xbb"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [
                    {"walletPublicKey": "0xaa", "clock": 5},
                ]
            })))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let wallets = vec![Wallet::new("0xaa"), Wallet::new("0xbb")];
        let map = client
            .clocks()
            .batch_status(&server.uri(), &wallets)
            .await
            .unwrap();

        assert_eq!(map.get(&Wallet::new("0xaa")), Some(&ClockValue(5)));
        // 0xbb absent from the response: unknown on that secondary.
        assert!(!map.contains_key(&Wallet::new("0xbb")));
    }

    #[tokio::test]
    async fn test_batch_status_negative_clock_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/batch_clock_status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [{"walletPublicKey": "0xaa", "clock": -1}]
            })))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let map = client
            .clocks()
            .batch_status(&server.uri(), &[Wallet::new("0xaa")])
            .await
            .unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_batch_status_failure_names_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/batch_clock_status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let err = client
            .clocks()
            .batch_status(&server.uri(), &[Wallet::new("0xaa")])
            .await
            .unwrap_err();
        match err {
            SyncError::ClockProbe { endpoint, .. } => assert_eq!(endpoint, server.uri()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
