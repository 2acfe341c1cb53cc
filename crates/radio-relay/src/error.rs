use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Everything the relay can answer with instead of the upstream body.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("missing endpoint parameter")]
    MissingEndpoint,

    #[error("invalid endpoint parameter: {0}")]
    InvalidEndpoint(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned a non-JSON body: {0}")]
    NotJson(#[from] serde_json::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MissingEndpoint => {
                (StatusCode::BAD_REQUEST, "Missing endpoint parameter").into_response()
            }
            RelayError::InvalidEndpoint(_) => {
                (StatusCode::BAD_REQUEST, "Invalid endpoint parameter").into_response()
            }
            RelayError::Upstream(_) | RelayError::NotJson(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch" })),
            )
                .into_response(),
        }
    }
}
