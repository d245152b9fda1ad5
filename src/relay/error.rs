//! Relay error taxonomy and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use super::upstream::JsonReply;

/// Failures raised while relaying a request.
///
/// Every variant renders as a JSON body, so nothing leaves the relay as an
/// unstructured error.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The `path` query parameter is absent or empty.
    #[error("Missing path parameter")]
    MissingPath,

    /// The upstream could not be reached or did not answer in time.
    #[error("{0}")]
    Transport(String),

    /// `upstream_base` + `path` did not form a valid URL.
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Anything else that went wrong inside the relay itself.
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    pub fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Transport("Upstream request timed out".to_string())
        } else if err.is_connect() {
            RelayError::Transport(format!("Upstream connection failed: {err}"))
        } else {
            RelayError::Transport(format!("Upstream request failed: {err}"))
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingPath => StatusCode::BAD_REQUEST,
            RelayError::Transport(_) => StatusCode::BAD_GATEWAY,
            RelayError::InvalidUrl(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn reply(&self) -> JsonReply {
        let body = match self {
            RelayError::Transport(msg) => json!({
                "error": msg,
                "status": 0,
                "upstream": true,
            }),
            other => json!({ "error": other.to_string() }),
        };
        JsonReply::new(self.status(), &body)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::MissingPath => {}
            RelayError::Transport(msg) => warn!(upstream = true, "Relay failed: {msg}"),
            other => warn!(upstream = false, "Relay failed: {other}"),
        }
        self.reply().into_response()
    }
}
