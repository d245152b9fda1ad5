use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// Longest upstream text echoed back in an `error` field.
const MAX_ERROR_TEXT: usize = 512;

/// Upstream response body, classified by a single parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    /// Valid JSON. `raw` is the original text, passed through untouched.
    Json { raw: String, value: Value },
    /// Non-empty text that is not JSON (plain text, HTML error page, ...).
    Text(String),
    /// Nothing but whitespace.
    Empty,
}

impl UpstreamBody {
    pub fn parse(text: String) -> Self {
        if text.trim().is_empty() {
            return UpstreamBody::Empty;
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => UpstreamBody::Json { raw: text, value },
            Err(_) => UpstreamBody::Text(text),
        }
    }
}

/// A JSON response: status plus a body that is guaranteed to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    pub status: StatusCode,
    pub body: String,
}

impl JsonReply {
    pub fn new(status: StatusCode, value: &Value) -> Self {
        Self {
            status,
            body: value.to_string(),
        }
    }
}

impl IntoResponse for JsonReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            self.body,
        )
            .into_response()
    }
}

/// Map an upstream status and body onto the outward reply.
///
/// - JSON: passed through unchanged with the upstream status.
/// - Not JSON, status < 400: wrapped as `{"data": text}`, status 200.
/// - Not JSON, status >= 500: `{"error","status","upstream":true}`, status 502.
/// - Not JSON, 4xx: same error body, upstream status preserved.
pub fn normalize(status: StatusCode, body: UpstreamBody) -> JsonReply {
    let text = match body {
        UpstreamBody::Json { raw, .. } => {
            return JsonReply { status, body: raw };
        }
        UpstreamBody::Text(text) => Some(text),
        UpstreamBody::Empty => None,
    };

    if status.as_u16() < 400 {
        return JsonReply::new(StatusCode::OK, &json!({ "data": text }));
    }

    let body = json!({
        "error": error_message(status, text.as_deref()),
        "status": status.as_u16(),
        "upstream": true,
    });
    let outward = if status.is_server_error() {
        StatusCode::BAD_GATEWAY
    } else {
        status
    };
    JsonReply::new(outward, &body)
}

fn error_message(status: StatusCode, text: Option<&str>) -> String {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) if t.chars().count() > MAX_ERROR_TEXT => t.chars().take(MAX_ERROR_TEXT).collect(),
        Some(t) => t.to_string(),
        None => format!("Upstream returned {status}"),
    }
}
