use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Shared error type used across all sidecars. Each variant maps to exactly
/// one HTTP status at the axum boundary via the `IntoResponse` impl below,
/// so handlers can return `Result<Json<T>, Error>` directly.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("upstream timeout: {0}")]
    ExternalTimeout(String),

    #[error("upstream error: {0}")]
    ExternalError(String),

    #[error("parse: {0}")]
    Parse(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client: {0}")]
    Reqwest(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Permission(_) => StatusCode::FORBIDDEN,
            Error::ExternalTimeout(_) | Error::ExternalError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Parse(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) | Error::Json(_) | Error::Reqwest(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
