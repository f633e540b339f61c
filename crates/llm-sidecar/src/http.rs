//! Axum router and handlers for the LLM sidecar's endpoints.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::runtime_client::ChatMessage;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let max_concurrent = state.config.server.max_concurrent_requests;
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/classifier/explain", get(explain))
        .route("/memory/add", post(memory_add))
        .route("/memory/search", post(memory_search))
        .route("/memory/:user_id/:memory_id", delete(memory_delete))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    Json(state.inference.health().await).into_response()
}

#[derive(Debug, Deserialize)]
struct ChatHistoryMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    user_id: String,
    message: String,
    #[serde(default)]
    history: Vec<ChatHistoryMessage>,
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let history: Vec<ChatMessage> = req
        .history
        .into_iter()
        .map(|m| ChatMessage {
            role: m.role,
            content: m.content,
        })
        .collect();

    match state.inference.chat(&req.user_id, &req.message, &history).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ExplainQuery {
    user_id: String,
    message: String,
}

async fn explain(State(state): State<AppState>, Query(q): Query<ExplainQuery>) -> Response {
    match state.inference.explain(&q.user_id, &q.message) {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct MemoryAddRequest {
    user_id: String,
    content: String,
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

fn default_source() -> String {
    "api".to_string()
}

async fn memory_add(State(state): State<AppState>, Json(req): Json<MemoryAddRequest>) -> Response {
    match state
        .inference
        .add_memory(&req.user_id, &req.content, &req.source, req.metadata)
        .await
    {
        Ok(id) => Json(serde_json::json!({ "id": id, "status": "added" })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct MemorySearchRequest {
    user_id: String,
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    5
}

async fn memory_search(State(state): State<AppState>, Json(req): Json<MemorySearchRequest>) -> Response {
    match state
        .inference
        .search_memory(&req.user_id, &req.query, req.top_k)
        .await
    {
        Ok(results) => Json(results).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct MemoryDeleteRequest {
    caller_id: String,
}

async fn memory_delete(
    State(state): State<AppState>,
    Path((user_id, memory_id)): Path<(String, Uuid)>,
    Json(req): Json<MemoryDeleteRequest>,
) -> Response {
    match state.inference.delete_memory(&req.caller_id, &user_id, memory_id).await {
        Ok(()) => Json(serde_json::json!({ "status": "deleted", "memory_id": memory_id })).into_response(),
        Err(e) => e.into_response(),
    }
}
