//! HTTP client for the LLM sidecar, used two ways: as the "remote LLM" the
//! gates impersonate a configured user to talk to (`/chat`), and as the
//! commit target once a correction is approved (`/memory/add`).

use std::collections::HashMap;

use jarvis_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LlmSidecarConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    user_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct MemoryAddRequest<'a> {
    user_id: &'a str,
    content: &'a str,
    source: &'a str,
    metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MemoryAddResponse {
    id: Uuid,
}

pub struct LlmSidecarClient {
    http: reqwest::Client,
    base_url: String,
    gate_user_id: String,
}

impl LlmSidecarClient {
    pub fn new(config: &LlmSidecarConfig) -> Self {
        Self {
            http: jarvis_domain::retry::client_with_timeout(config.timeout_ms),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            gate_user_id: config.gate_user_id.clone(),
        }
    }

    /// Sends `prompt` to the LLM sidecar's `/chat` endpoint impersonating
    /// the configured gate user, returning the model's raw text response.
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat", self.base_url);
        let body = ChatRequest {
            user_id: &self.gate_user_id,
            message: prompt,
        };
        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::ExternalTimeout(format!("llm sidecar chat timed out: {e}"))
            } else {
                Error::ExternalError(format!("llm sidecar chat failed: {e}"))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalError(format!(
                "llm sidecar chat HTTP {status}: {text}"
            )));
        }

        let parsed: ChatResponse = resp.json().await?;
        Ok(parsed.response)
    }

    pub async fn add_memory(
        &self,
        user_id: &str,
        content: &str,
        source: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Uuid> {
        let url = format!("{}/memory/add", self.base_url);
        let body = MemoryAddRequest {
            user_id,
            content,
            source,
            metadata,
        };
        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::ExternalTimeout(format!("llm sidecar memory/add timed out: {e}"))
            } else {
                Error::ExternalError(format!("llm sidecar memory/add failed: {e}"))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalError(format!(
                "llm sidecar memory/add HTTP {status}: {text}"
            )));
        }

        let parsed: MemoryAddResponse = resp.json().await?;
        Ok(parsed.id)
    }

    pub async fn is_reachable(&self) -> bool {
        self.http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
