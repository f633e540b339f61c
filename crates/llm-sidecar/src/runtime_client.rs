//! HTTP client for the local chat runtime.
//!
//! Treated as an out-of-scope external collaborator, reached over its
//! Ollama-shaped, non-streaming `/api/chat` endpoint the same way the
//! reference codebase's REST client talks to its own external service
//! rather than embedding a model in-process.

use jarvis_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

pub struct RuntimeClient {
    http: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            http: jarvis_domain::retry::client_with_timeout(timeout_ms),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages,
            stream: false,
        };
        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::ExternalTimeout(format!("chat runtime request timed out: {e}"))
            } else {
                Error::ExternalError(format!("chat runtime request failed: {e}"))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalError(format!(
                "chat runtime HTTP {status}: {text}"
            )));
        }

        let parsed: ChatResponse = resp.json().await?;
        Ok(parsed.message.content)
    }

    /// `true` only on a successful HTTP status; any transport failure or
    /// error response counts as unreachable.
    pub async fn is_reachable(&self) -> bool {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    pub async fn models_available(&self) -> Vec<String> {
        let Ok(resp) = self.http.get(format!("{}/api/tags", self.base_url)).send().await else {
            return Vec::new();
        };
        let Ok(parsed) = resp.json::<TagsResponse>().await else {
            return Vec::new();
        };
        parsed.models.into_iter().map(|m| m.name).collect()
    }
}
