//! Contract tests for the Chroma-compatible vector database client.

use jarvis_llm_sidecar::memory::chroma_client::ChromaClient;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn query_parses_parallel_arrays_into_hits() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/v1/collections/memory_dad/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ids": [[id.to_string()]],
            "documents": [["remember the milk"]],
            "metadatas": [[{"user_id": "dad"}]],
            "distances": [[0.2]],
        })))
        .mount(&server)
        .await;

    let client = ChromaClient::new(&server.uri(), 5_000);
    let hits = client.query("memory_dad", &[0.1, 0.2], 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
    assert_eq!(hits[0].document, "remember the milk");
    assert!((hits[0].distance - 0.2).abs() < 1e-9);
}

#[tokio::test]
async fn query_with_zero_results_never_calls_backend() {
    let server = MockServer::start().await;
    let client = ChromaClient::new(&server.uri(), 5_000);
    let hits = client.query("memory_dad", &[0.1], 0).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn delete_reports_false_when_nothing_matched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/collections/memory_dad/delete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ids": []})))
        .mount(&server)
        .await;

    let client = ChromaClient::new(&server.uri(), 5_000);
    let deleted = client.delete("memory_dad", Uuid::new_v4()).await.unwrap();
    assert!(!deleted);
}

#[tokio::test]
async fn heartbeat_is_false_on_transport_failure() {
    let client = ChromaClient::new("http://127.0.0.1:1", 200);
    assert!(!client.heartbeat().await);
}
