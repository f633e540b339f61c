//! HTTP client for a Chroma-compatible vector database.
//!
//! The vector database engine is an out-of-scope external collaborator;
//! this is the thin REST wrapper the memory store drives, in the same
//! spirit as the reference codebase's `RestSerialMemoryClient` wrapping a
//! separate HTTP service rather than embedding one in-process.

use jarvis_domain::error::{Error, Result};
use uuid::Uuid;

pub struct ChromaClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: Uuid,
    pub document: String,
    pub metadata: serde_json::Value,
    pub distance: f64,
}

impl ChromaClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            http: jarvis_domain::retry::client_with_timeout(timeout_ms),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Creates the named collection if it does not already exist. Chroma's
    /// `get_or_create` semantics make this idempotent and safe to call on
    /// every startup.
    pub async fn ensure_collection(&self, name: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/api/v1/collections"))
            .json(&serde_json::json!({ "name": name, "get_or_create": true }))
            .send()
            .await
            .map_err(map_reqwest_err)?;
        ensure_success(resp).await.map(|_| ())
    }

    pub async fn add(
        &self,
        collection: &str,
        id: Uuid,
        embedding: &[f32],
        document: &str,
        metadata: &serde_json::Value,
    ) -> Result<()> {
        let resp = self
            .http
            .post(self.url(&format!("/api/v1/collections/{collection}/add")))
            .json(&serde_json::json!({
                "ids": [id.to_string()],
                "embeddings": [embedding],
                "documents": [document],
                "metadatas": [metadata],
            }))
            .send()
            .await
            .map_err(map_reqwest_err)?;
        ensure_success(resp).await.map(|_| ())
    }

    pub async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryHit>> {
        if n_results == 0 {
            return Ok(Vec::new());
        }
        let resp = self
            .http
            .post(self.url(&format!("/api/v1/collections/{collection}/query")))
            .json(&serde_json::json!({
                "query_embeddings": [embedding],
                "n_results": n_results,
            }))
            .send()
            .await
            .map_err(map_reqwest_err)?;
        let body = ensure_success(resp).await?;

        let ids = body["ids"][0].as_array().cloned().unwrap_or_default();
        let documents = body["documents"][0].as_array().cloned().unwrap_or_default();
        let metadatas = body["metadatas"][0].as_array().cloned().unwrap_or_default();
        let distances = body["distances"][0].as_array().cloned().unwrap_or_default();

        let mut hits = Vec::with_capacity(ids.len());
        for i in 0..ids.len() {
            let Some(id_str) = ids.get(i).and_then(|v| v.as_str()) else {
                continue;
            };
            let Ok(id) = Uuid::parse_str(id_str) else {
                continue;
            };
            let document = documents
                .get(i)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let metadata = metadatas.get(i).cloned().unwrap_or(serde_json::json!({}));
            let distance = distances.get(i).and_then(|v| v.as_f64()).unwrap_or(2.0);
            hits.push(QueryHit {
                id,
                document,
                metadata,
                distance,
            });
        }
        Ok(hits)
    }

    /// Returns `true` iff exactly one collection held `id`.
    pub async fn delete(&self, collection: &str, id: Uuid) -> Result<bool> {
        let resp = self
            .http
            .post(self.url(&format!("/api/v1/collections/{collection}/delete")))
            .json(&serde_json::json!({ "ids": [id.to_string()] }))
            .send()
            .await
            .map_err(map_reqwest_err)?;
        let body = ensure_success(resp).await?;
        let deleted_ids = body
            .as_array()
            .or_else(|| body.get("ids").and_then(|v| v.as_array()))
            .cloned()
            .unwrap_or_default();
        Ok(!deleted_ids.is_empty())
    }

    pub async fn heartbeat(&self) -> bool {
        self.http
            .get(self.url("/api/v1/heartbeat"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

fn map_reqwest_err(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::ExternalTimeout(format!("vector db request timed out: {e}"))
    } else {
        Error::ExternalError(format!("vector db request failed: {e}"))
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<serde_json::Value> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(Error::ExternalError(format!(
            "vector db HTTP {status}: {text}"
        )));
    }
    Ok(resp.json().await.unwrap_or(serde_json::json!(null)))
}
