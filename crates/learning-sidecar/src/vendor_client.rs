//! HTTP client for the external fact-check vendor (Gate 2b). Treated
//! strictly as an out-of-scope collaborator: a single chat-completion call
//! against an Anthropic Messages-shaped endpoint. Never receives
//! personal-info content (enforced one layer up, in [`crate::gates`]).

use jarvis_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::VendorConfig;

#[derive(Debug, Serialize)]
struct VendorMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct VendorRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<VendorMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct VendorContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct VendorResponse {
    content: Vec<VendorContentBlock>,
}

pub struct VendorClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    max_retries: u32,
}

impl VendorClient {
    pub fn new(config: &VendorConfig) -> Self {
        Self {
            http: jarvis_domain::retry::client_with_timeout(config.timeout_ms),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Calls the vendor's messages endpoint with a single user turn.
    /// Returns `Err` on any transport/HTTP failure — callers in
    /// [`crate::gates`] are responsible for coercing that into the
    /// "never block on an external outage" policy.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::Internal("vendor client has no api key configured".into()));
        };
        let url = format!("{}/v1/messages", self.base_url);
        let body = VendorRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![VendorMessage {
                role: "user",
                content: prompt,
            }],
        };

        // Transient network failures (not timeouts, which already exhausted
        // the per-call budget) get a couple of backed-off retries, the same
        // posture the reference REST client takes toward its own backend.
        let resp = jarvis_domain::retry::with_backoff(self.max_retries, || {
            self.http
                .post(&url)
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::ExternalTimeout(format!("vendor request timed out: {e}"))
            } else {
                Error::ExternalError(format!("vendor request failed: {e}"))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalError(format!("vendor HTTP {status}: {text}")));
        }

        let parsed: VendorResponse = resp.json().await?;
        let text = parsed
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}
