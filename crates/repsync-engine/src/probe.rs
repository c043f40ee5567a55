//! Clock-state probing: local lookups and batched remote queries.

use async_trait::async_trait;
use futures_util::future::join_all;
use repsync_client::NodeClient;
use repsync_core::{ClockValue, Result, UserReplicaAssignment, Wallet};
use std::collections::HashMap;
use tracing::warn;

/// Local clock store collaborator.
///
/// Read-only from the engine's perspective: clocks are advanced by the
/// content-ingestion write path, never here.
#[async_trait]
pub trait ClockStore: Send + Sync {
    /// Clock value for `wallet` on this node, or `None` if the user has
    /// no local record.
    async fn local_clock(&self, wallet: &Wallet) -> Result<Option<ClockValue>>;
}

/// Per-endpoint clock maps from one probe pass. An endpoint whose probe
/// failed maps to an empty inner map, so all of its users read as unknown.
pub type RemoteClockMap = HashMap<String, HashMap<Wallet, ClockValue>>;

/// Probe every distinct secondary endpoint referenced by `assignments`.
///
/// Exactly one batch request per distinct endpoint, issued concurrently
/// and joined as a full barrier; the caller only decides once every probe
/// has completed or failed. A per-endpoint failure is logged and localized
/// — the rest of the cycle proceeds, and that endpoint's users fall back
/// to unknown, deterministically forcing a sync attempt for them.
pub async fn probe_secondaries(
    client: &NodeClient,
    assignments: &[UserReplicaAssignment],
) -> RemoteClockMap {
    let mut by_endpoint: HashMap<&str, Vec<Wallet>> = HashMap::new();
    for assignment in assignments {
        for secondary in assignment.secondaries() {
            by_endpoint
                .entry(secondary)
                .or_default()
                .push(assignment.wallet.clone());
        }
    }

    let probes = by_endpoint.into_iter().map(|(endpoint, wallets)| async move {
        match client.clocks().batch_status(endpoint, &wallets).await {
            Ok(clocks) => (endpoint.to_string(), clocks),
            Err(e) => {
                warn!(endpoint, error = %e, "clock probe failed; treating its users as unknown");
                (endpoint.to_string(), HashMap::new())
            }
        }
    });

    join_all(probes).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn assignment(wallet: &str, s1: &str, s2: &str) -> UserReplicaAssignment {
        UserReplicaAssignment {
            wallet: Wallet::new(wallet),
            secondary1: s1.to_string(),
            secondary2: s2.to_string(),
        }
    }

    #[tokio::test]
    async fn test_one_request_per_distinct_endpoint() {
        let cn2 = MockServer::start().await;
        let cn3 = MockServer::start().await;

        // Both users share cn2 as a secondary; it must still see exactly
        // one batch request.
        for server in [&cn2, &cn3] {
            Mock::given(method("POST"))
                .and(path("/users/batch_clock_status"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "users": [
                        {"walletPublicKey": "0xaa", "clock": 4},
                        {"walletPublicKey": "0xbb", "clock": 2},
                    ]
                })))
                .expect(1)
                .mount(server)
                .await;
        }

        let assignments = vec![
            assignment("0xaa", &cn2.uri(), &cn3.uri()),
            assignment("0xbb", &cn2.uri(), &cn3.uri()),
        ];

        let client = NodeClient::new();
        let map = probe_secondaries(&client, &assignments).await;

        assert_eq!(map.len(), 2);
        assert_eq!(
            map[&cn2.uri()].get(&Wallet::new("0xaa")),
            Some(&ClockValue(4))
        );
        assert_eq!(
            map[&cn3.uri()].get(&Wallet::new("0xbb")),
            Some(&ClockValue(2))
        );
    }

    #[tokio::test]
    async fn test_failed_endpoint_reads_as_unknown() {
        let good = MockServer::start().await;
        let bad = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/batch_clock_status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [{"walletPublicKey": "0xaa", "clock": 9}]
            })))
            .mount(&good)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/batch_clock_status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&bad)
            .await;

        let assignments = vec![assignment("0xaa", &good.uri(), &bad.uri())];

        let client = NodeClient::new();
        let map = probe_secondaries(&client, &assignments).await;

        // Both endpoints are present in the barrier result; the failed one
        // holds no entries.
        assert_eq!(map[&good.uri()].len(), 1);
        assert!(map[&bad.uri()].is_empty());
    }
}
