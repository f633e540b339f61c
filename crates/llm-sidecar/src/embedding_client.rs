//! HTTP client for the embedding backend.
//!
//! The embedding model itself is an out-of-scope external collaborator; this
//! is a plain `reqwest` call against an Ollama-compatible `/api/embeddings`
//! endpoint, the same shape the reference codebase's smart-router classifier
//! uses to fetch embeddings for tier centroids.

use jarvis_domain::error::{Error, Result};

use crate::config::EmbeddingConfig;

pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let http = jarvis_domain::retry::client_with_timeout(config.timeout_ms);
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = serde_json::json!({ "model": self.model, "prompt": text });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ExternalTimeout(format!("embedding request timed out: {e}"))
                } else {
                    Error::ExternalError(format!("embedding request failed: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalError(format!(
                "embedding backend HTTP {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp.json().await?;
        let embedding = json
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Parse("embedding response missing 'embedding' array".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        Ok(l2_normalize(embedding))
    }

    pub async fn is_healthy(&self) -> bool {
        self.embed("health check").await.is_ok()
    }
}

fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}
