//! Directory endpoints: which users have this node as primary.

use crate::NodeClient;
use repsync_core::{Result, SyncError, UserReplicaAssignment};
use serde::Deserialize;

/// Envelope used by the directory service
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Directory (replica-assignment) endpoints
pub struct DirectoryApi<'a> {
    client: &'a NodeClient,
}

impl<'a> DirectoryApi<'a> {
    pub(crate) fn new(client: &'a NodeClient) -> Self {
        Self { client }
    }

    /// Fetch the replica assignments for every user whose primary is
    /// `node_endpoint`.
    ///
    /// An empty list is a valid answer (no users assigned). Any transport
    /// or protocol failure surfaces as [`SyncError::Directory`] and aborts
    /// the calling cycle; partial results are never returned.
    pub async fn assignments(
        &self,
        directory_endpoint: &str,
        node_endpoint: &str,
    ) -> Result<Vec<UserReplicaAssignment>> {
        let envelope: DataEnvelope<Vec<UserReplicaAssignment>> = self
            .client
            .get(
                directory_endpoint,
                "/users/creator_node",
                &[("creator_node_endpoint", node_endpoint)],
            )
            .await
            .map_err(|e| SyncError::Directory(e.to_string()))?;

        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_assignments_parses_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/creator_node"))
            .and(query_param("creator_node_endpoint", "http://cn1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"wallet": "0xAA", "secondary1": "http://cn2", "secondary2": "http://cn3"}
                ]
            })))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let assignments = client
            .directory()
            .assignments(&server.uri(), "http://cn1")
            .await
            .unwrap();

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].wallet.as_str(), "0xaa");
        assert_eq!(assignments[0].secondary1, "http://cn2");
    }

    #[tokio::test]
    async fn test_assignments_empty_list_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/creator_node"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": []
            })))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let assignments = client
            .directory()
            .assignments(&server.uri(), "http://cn1")
            .await
            .unwrap();
        assert!(assignments.is_empty());
    }

    #[tokio::test]
    async fn test_assignments_server_error_is_directory_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/creator_node"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = NodeClient::new();
        let err = client
            .directory()
            .assignments(&server.uri(), "http://cn1")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Directory(_)));
        assert!(err.aborts_cycle());
    }
}
