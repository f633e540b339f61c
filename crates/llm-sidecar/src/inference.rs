//! Composes the classifier, memory store, and chat runtime into the one
//! `chat` operation the HTTP layer exposes.

use std::str::FromStr;

use jarvis_domain::error::{Error, Result};
use jarvis_domain::users::{Profiles, UserId};
use serde::Serialize;

use crate::classifier::{self, ClassifyResult, Classifier};
use crate::config::RuntimeConfig;
use crate::memory::MemoryStore;
use crate::runtime_client::{ChatMessage, RuntimeClient};

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub model_used: String,
    pub memories_used: Vec<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplainResponse {
    pub model_selected: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ollama: String,
    pub chromadb: String,
    pub models_available: Vec<String>,
}

pub struct InferenceEngine {
    classifier: Classifier,
    memory: MemoryStore,
    runtime: RuntimeClient,
    runtime_config: RuntimeConfig,
    profiles: Profiles,
    chat_top_k: usize,
}

impl InferenceEngine {
    pub fn new(
        classifier: Classifier,
        memory: MemoryStore,
        runtime: RuntimeClient,
        runtime_config: RuntimeConfig,
        profiles: Profiles,
        chat_top_k: usize,
    ) -> Self {
        Self {
            classifier,
            memory,
            runtime,
            runtime_config,
            profiles,
            chat_top_k,
        }
    }

    fn resolve_user(user_id: &str) -> Result<UserId> {
        UserId::from_str(user_id).map_err(|_| Error::Validation(format!("unknown user_id: {user_id}")))
    }

    pub async fn chat(
        &self,
        user_id: &str,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatResponse> {
        let uid = Self::resolve_user(user_id)?;
        let ClassifyResult { model_key, .. } = self.classifier.classify(uid, message, &self.profiles);
        let model_name = classifier::resolve_model_name(model_key, &self.runtime_config);

        let memories = self.memory.search(user_id, message, self.chat_top_k).await?;
        let memories_used: Vec<String> = memories.into_iter().map(|m| m.content).collect();

        let mut system_prompt = self
            .profiles
            .get(uid)
            .map(|p| p.system_prompt.clone())
            .unwrap_or_else(|| format!("You are a helpful family assistant speaking with {user_id}."));
        if !memories_used.is_empty() {
            system_prompt.push_str("\n\nRelevant context from memory:\n");
            for memory in &memories_used {
                system_prompt.push_str("- ");
                system_prompt.push_str(memory);
                system_prompt.push('\n');
            }
        }

        let mut messages = vec![ChatMessage {
            role: "system".into(),
            content: system_prompt,
        }];
        messages.extend(
            history
                .iter()
                .filter(|m| m.role == "user" || m.role == "assistant")
                .cloned(),
        );
        messages.push(ChatMessage {
            role: "user".into(),
            content: message.to_string(),
        });

        let response = self.runtime.chat(&model_name, &messages).await?;

        Ok(ChatResponse {
            response,
            model_used: model_name,
            memories_used,
            user_id: user_id.to_string(),
        })
    }

    pub fn explain(&self, user_id: &str, message: &str) -> Result<ExplainResponse> {
        let uid = Self::resolve_user(user_id)?;
        let result = self.classifier.classify(uid, message, &self.profiles);
        let model_selected = classifier::resolve_model_name(result.model_key, &self.runtime_config);
        Ok(ExplainResponse {
            model_selected,
            reason: result.reason,
        })
    }

    pub async fn health(&self) -> HealthResponse {
        let ollama = if self.runtime.is_reachable().await {
            "reachable"
        } else {
            "unreachable"
        };
        let chromadb = if self.memory.is_healthy().await {
            "ok"
        } else {
            "error"
        };
        let models_available = self.runtime.models_available().await;
        HealthResponse {
            ollama: ollama.to_string(),
            chromadb: chromadb.to_string(),
            models_available,
        }
    }

    pub async fn add_memory(
        &self,
        user_id: &str,
        content: &str,
        source: &str,
        metadata: std::collections::HashMap<String, serde_json::Value>,
    ) -> Result<uuid::Uuid> {
        self.memory.add(user_id, content, source, metadata).await
    }

    pub async fn search_memory(
        &self,
        user_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<crate::memory::SearchResult>> {
        self.memory.search(user_id, query, top_k).await
    }

    pub async fn delete_memory(&self, caller_id: &str, owner_id: &str, memory_id: uuid::Uuid) -> Result<()> {
        let caller = Self::resolve_user(caller_id)?;
        if !self.profiles.is_admin(caller) {
            return Err(Error::Permission(format!(
                "{caller_id} is not authorized to delete memories"
            )));
        }
        if self.memory.delete(owner_id, memory_id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("memory {memory_id} not found")))
        }
    }
}
