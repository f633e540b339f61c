//! Axum router and handlers for the voice sidecar's three endpoints.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use jarvis_domain::error::Error;
use serde::Serialize;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::wav::decode_wav;

pub fn router(state: AppState) -> Router {
    let max_concurrent = state.config.server.max_concurrent_requests;
    Router::new()
        .route("/health", get(health))
        .route("/voice/process", post(process))
        .route("/voice/reload-embeddings", post(reload_embeddings))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    vad: &'static str,
    speaker_id: &'static str,
    transcription: &'static str,
    loaded_users: Vec<String>,
    whisper_model: String,
}

async fn health(State(state): State<AppState>) -> Response {
    let loaded_users = state.fingerprints.loaded_users();
    let speaker_id_status = if loaded_users.is_empty() {
        "degraded"
    } else {
        "ok"
    };
    let status = if speaker_id_status == "ok" { "ok" } else { "degraded" };
    let body = HealthResponse {
        status,
        vad: "ok",
        speaker_id: speaker_id_status,
        transcription: "ok",
        loaded_users,
        whisper_model: state.config.transcription.model.clone(),
    };
    let http_status = if status == "ok" || status == "degraded" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (http_status, Json(body)).into_response()
}

async fn process(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    match process_inner(state, &mut multipart).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn process_inner(
    state: AppState,
    multipart: &mut Multipart,
) -> jarvis_domain::error::Result<crate::pipeline::VoiceResult> {
    let mut wav_bytes: Option<Vec<u8>> = None;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| Error::Validation(format!("multipart error: {e}")))?;
        let Some(field) = field else { break };
        let filename = field.file_name().unwrap_or("").to_string();
        if !filename.to_lowercase().ends_with(".wav") {
            return Err(Error::Validation("expected a .wav upload".into()));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("reading upload: {e}")))?;
        wav_bytes = Some(bytes.to_vec());
    }

    let bytes = wav_bytes.ok_or_else(|| Error::Validation("no .wav file in upload".into()))?;
    let decoded = decode_wav(&bytes)?;

    // The pipeline runs FFT-based voiceprint computation, which is
    // CPU-bound; offload it to the blocking-task pool so it doesn't
    // monopolize a tokio worker thread.
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || pipeline.process(&decoded.samples, decoded.sample_rate))
        .await
        .map_err(|e| Error::Internal(format!("voice pipeline task panicked: {e}")))?
}

#[derive(Serialize)]
struct ReloadResponse {
    status: &'static str,
    loaded_users: Vec<String>,
    missing_users: Vec<String>,
}

async fn reload_embeddings(State(state): State<AppState>) -> Response {
    let report = state.reload_fingerprints();
    Json(ReloadResponse {
        status: "reloaded",
        loaded_users: report.loaded,
        missing_users: report.missing,
    })
    .into_response()
}
