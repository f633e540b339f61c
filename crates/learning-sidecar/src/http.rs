//! Axum router and handlers for the learning sidecar's four endpoints.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::model::Correction;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let max_concurrent = state.config.server.max_concurrent_requests;
    Router::new()
        .route("/health", get(health))
        .route("/learning/submit", post(submit))
        .route("/learning/status/:id", get(status))
        .route("/learning/pending", get(pending))
        .route("/learning/review/:id", post(review))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    llm_sidecar: &'static str,
    claude_api: &'static str,
    pending_count: usize,
    storage: &'static str,
}

async fn health(State(state): State<AppState>) -> Response {
    let llm_sidecar = if state.pipeline.llm().is_reachable().await {
        "reachable"
    } else {
        "unreachable"
    };
    let claude_api = if state.pipeline.vendor().is_configured() {
        "configured"
    } else {
        "not_configured"
    };
    let storage = if state.pipeline.store().health_check() {
        "ok"
    } else {
        "error"
    };
    Json(HealthResponse {
        status: "ok",
        llm_sidecar,
        claude_api,
        pending_count: state.pipeline.store().pending_count(),
        storage,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    user_id: String,
    content: String,
    #[serde(default = "default_source")]
    source: String,
}

fn default_source() -> String {
    "user_correction".to_string()
}

#[derive(Serialize)]
struct SubmitResponse {
    id: Uuid,
    status: &'static str,
}

async fn submit(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> Response {
    tracing::info!(user_id = %req.user_id, "received correction submission");
    let correction = Correction::new(req.user_id, req.content, req.source);
    let id = correction.id;

    if let Err(e) = state.pipeline.store().save(&correction) {
        tracing::error!(error = %e, "failed to persist new correction");
        return jarvis_domain::error::Error::Storage(e.to_string()).into_response();
    }

    // Scheduled after the response has been built; `tokio::spawn` hands the
    // gate pipeline to a background task so this handler returns as soon as
    // the submit acknowledgement is ready, matching the "process after
    // response is sent" contract.
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.process(correction).await;
    });

    Json(SubmitResponse {
        id,
        status: "processing",
    })
    .into_response()
}

async fn status(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.pipeline.store().load(id) {
        Ok(correction) => Json(correction).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Serialize)]
struct PendingItem {
    id: Uuid,
    user_id: String,
    content: String,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
struct PendingResponse {
    count: usize,
    items: Vec<PendingItem>,
}

async fn pending(State(state): State<AppState>) -> Response {
    match state.pipeline.store().list_pending() {
        Ok(corrections) => {
            let items: Vec<PendingItem> = corrections
                .into_iter()
                .map(|c| PendingItem {
                    id: c.id,
                    user_id: c.user_id,
                    content: c.content,
                    submitted_at: c.submitted_at,
                })
                .collect();
            Json(PendingResponse {
                count: items.len(),
                items,
            })
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    action: String,
    caller_id: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Serialize)]
struct ReviewResponse {
    id: Uuid,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

async fn review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Response {
    match state
        .pipeline
        .review(id, &req.caller_id, &req.action, req.reason.clone())
        .await
    {
        Ok(correction) => Json(ReviewResponse {
            id: correction.id,
            status: correction.final_status.as_str().to_string(),
            memory_id: correction.memory_id,
            reason: req.reason,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}
