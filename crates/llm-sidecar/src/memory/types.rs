use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub content: String,
    pub score: f64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub id: Uuid,
}
