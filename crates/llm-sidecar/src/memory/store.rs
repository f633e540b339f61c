//! Per-user isolated memory collections plus one shared, cross-user
//! collection. Physical isolation: each user gets its own named collection,
//! so a leak would require querying the wrong collection by name, which
//! this module never does.

use std::collections::HashMap;

use chrono::Utc;
use jarvis_domain::error::{Error, Result};
use jarvis_domain::users::{is_shared, UserId, SHARED};
use uuid::Uuid;

use crate::config::{EmbeddingConfig, VectorDbConfig};
use crate::embedding_client::EmbeddingClient;
use crate::memory::chroma_client::ChromaClient;
use crate::memory::types::SearchResult;

fn collection_name(user_id: &str) -> String {
    format!("memory_{user_id}")
}

pub struct MemoryStore {
    embedding: EmbeddingClient,
    db: ChromaClient,
}

impl MemoryStore {
    pub fn new(embedding_config: &EmbeddingConfig, vector_db_config: &VectorDbConfig) -> Self {
        Self {
            embedding: EmbeddingClient::new(embedding_config),
            db: ChromaClient::new(&vector_db_config.base_url, vector_db_config.timeout_ms),
        }
    }

    /// Creates all five collections (`memory_<uid>` for each known user plus
    /// `memory_shared`) if they do not already exist. Idempotent.
    pub async fn ensure_collections(&self) -> Result<()> {
        for uid in UserId::ALL {
            self.db.ensure_collection(&collection_name(uid.as_str())).await?;
        }
        self.db.ensure_collection(&collection_name(SHARED)).await?;
        Ok(())
    }

    fn validate_user(user_id: &str) -> Result<()> {
        if is_shared(user_id) || user_id.parse::<UserId>().is_ok() {
            Ok(())
        } else {
            Err(Error::Validation(format!("unknown user_id: {user_id}")))
        }
    }

    pub async fn add(
        &self,
        user_id: &str,
        content: &str,
        source: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Uuid> {
        Self::validate_user(user_id)?;
        let id = Uuid::new_v4();
        let timestamp = Utc::now();
        let embedding = self.embedding.embed(content).await?;

        let mut full_metadata = serde_json::Map::new();
        for (k, v) in metadata {
            full_metadata.insert(k, v);
        }
        full_metadata.insert("user_id".into(), serde_json::json!(user_id));
        full_metadata.insert("timestamp".into(), serde_json::json!(timestamp.to_rfc3339()));
        full_metadata.insert("source".into(), serde_json::json!(source));

        self.db
            .add(
                &collection_name(user_id),
                id,
                &embedding,
                content,
                &serde_json::Value::Object(full_metadata),
            )
            .await?;
        Ok(id)
    }

    /// Searches the caller's own collection plus the shared collection,
    /// merges by score, and returns the top `top_k`. Never touches any
    /// other user's collection, so cross-user leakage is structurally
    /// impossible rather than merely filtered out after the fact.
    pub async fn search(&self, user_id: &str, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        Self::validate_user(user_id)?;
        let embedding = self.embedding.embed(query).await?;

        let own_hits = self
            .db
            .query(&collection_name(user_id), &embedding, top_k)
            .await?;
        let shared_hits = if is_shared(user_id) {
            Vec::new()
        } else {
            self.db
                .query(&collection_name(SHARED), &embedding, top_k)
                .await?
        };

        let mut results: Vec<SearchResult> = own_hits
            .into_iter()
            .chain(shared_hits)
            .map(|hit| {
                let score = (1.0 - hit.distance / 2.0).max(0.0);
                let score = (score * 10_000.0).round() / 10_000.0;
                let owner = hit
                    .metadata
                    .get("user_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or(user_id)
                    .to_string();
                let source = hit
                    .metadata
                    .get("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let timestamp = hit
                    .metadata
                    .get("timestamp")
                    .and_then(|v| v.as_str())
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now);
                SearchResult {
                    content: hit.document,
                    score,
                    source,
                    timestamp,
                    user_id: owner,
                    id: hit.id,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }

    /// Attempts delete from the user's own collection first, then shared.
    /// Returns `true` iff exactly one collection held the id.
    pub async fn delete(&self, user_id: &str, memory_id: Uuid) -> Result<bool> {
        Self::validate_user(user_id)?;
        if self.db.delete(&collection_name(user_id), memory_id).await? {
            return Ok(true);
        }
        self.db.delete(&collection_name(SHARED), memory_id).await
    }

    pub async fn is_healthy(&self) -> bool {
        self.db.heartbeat().await
    }
}

#[cfg(test)]
mod tests {
    use super::collection_name;

    #[test]
    fn collection_names_are_namespaced() {
        assert_eq!(collection_name("dad"), "memory_dad");
        assert_eq!(collection_name("shared"), "memory_shared");
    }
}
