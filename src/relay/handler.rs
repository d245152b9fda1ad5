//! HTTP handlers for the relay endpoints.

use axum::Json;
use axum::extract::{FromRequest, Multipart, RawQuery, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use super::error::RelayError;
use super::state::RelayState;
use super::upstream::{JsonReply, UpstreamBody, normalize};
use crate::types::PoolCheck;
use crate::{PATH_PARAM, SOFT_CHECK_PARAM};

/// Largest JSON body read from an inbound request.
pub const MAX_JSON_BODY: usize = 2 * 1024 * 1024;

/// Query parameters of one relay call, split into control and passthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayQuery {
    pub path: String,
    pub soft_check: bool,
    pub passthrough: Vec<(String, String)>,
}

impl RelayQuery {
    /// Parse a raw query string. Fails with `MissingPath` when `path` is absent or empty.
    ///
    /// The returned `path` always starts with `/`.
    pub fn parse(raw: Option<&str>) -> Result<Self, RelayError> {
        let mut path = None;
        let mut soft_check = false;
        let mut passthrough = Vec::new();

        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                PATH_PARAM => {
                    if path.is_none() {
                        path = Some(value.into_owned());
                    }
                }
                SOFT_CHECK_PARAM => {
                    soft_check = matches!(value.as_ref(), "1" | "true");
                }
                _ => passthrough.push((key.into_owned(), value.into_owned())),
            }
        }

        let path = path
            .filter(|p| !p.trim().is_empty())
            .ok_or(RelayError::MissingPath)?;
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Ok(Self {
            path,
            soft_check,
            passthrough,
        })
    }
}

/// ANY /relay?path=...
///
/// Forwards the request to the upstream and normalizes the answer to JSON.
pub async fn relay(
    State(state): State<RelayState>,
    RawQuery(raw_query): RawQuery,
    request: Request,
) -> Result<Response, RelayError> {
    let query = RelayQuery::parse(raw_query.as_deref())?;
    let url = state.upstream_url(&query.path, &query.passthrough)?;
    let method = request.method().clone();

    if query.soft_check && state.soft_check_applies(&method, &query.path) {
        let auth = request.headers().get(header::AUTHORIZATION).cloned();
        let check = soft_check(&state, url, auth).await;
        debug!(path = %query.path, exists = check.exists(), "Soft check");
        return Ok(Json(check).into_response());
    }

    debug!(%method, path = %query.path, "Relaying");
    let reply = forward(&state, method, url, request).await?;
    if reply.status.is_client_error() || reply.status.is_server_error() {
        info!(path = %query.path, status = reply.status.as_u16(), "Upstream error relayed");
    }
    Ok(reply.into_response())
}

/// GET /health
pub async fn health(State(state): State<RelayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "upstream": state.upstream_base().as_str(),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> JsonReply {
    JsonReply::new(StatusCode::NOT_FOUND, &json!({ "error": "Not found" }))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("multipart/form-data"))
}

/// Forward one request upstream and normalize the response.
async fn forward(
    state: &RelayState,
    method: Method,
    url: Url,
    request: Request,
) -> Result<JsonReply, RelayError> {
    let mut builder = state
        .http
        .request(method.clone(), url)
        .header(header::ACCEPT, "application/json");
    if let Some(auth) = request.headers().get(header::AUTHORIZATION) {
        builder = builder.header(header::AUTHORIZATION, auth.clone());
    }

    if is_multipart(request.headers()) {
        // Content-Type is left to reqwest so the new boundary is set.
        let form = reencode_multipart(state, request).await?;
        builder = builder.multipart(form);
    } else {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        let body = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
            .await
            .map_err(|e| RelayError::Internal(format!("failed to read request body: {e}")))?;
        if method != Method::GET && method != Method::HEAD && !body.is_empty() {
            builder = builder.body(body);
        }
    }

    let response = builder.send().await.map_err(RelayError::transport)?;
    let status = response.status();
    let text = response.text().await.map_err(RelayError::transport)?;
    Ok(normalize(status, UpstreamBody::parse(text)))
}

/// Rebuild an inbound multipart body as a fresh `reqwest` form.
async fn reencode_multipart(
    state: &RelayState,
    request: Request,
) -> Result<reqwest::multipart::Form, RelayError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| RelayError::Internal(format!("invalid multipart body: {e}")))?;

    let mut form = reqwest::multipart::Form::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::Internal(format!("invalid multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| RelayError::Internal(format!("failed to read field {name}: {e}")))?;

        let mut part = reqwest::multipart::Part::bytes(bytes.to_vec());
        if let Some(file_name) = file_name {
            part = part.file_name(file_name);
        }
        if let Some(content_type) = content_type {
            part = part
                .mime_str(&content_type)
                .map_err(|e| RelayError::Internal(format!("invalid content type: {e}")))?;
        }
        form = form.part(name, part);
    }
    Ok(form)
}

/// Existence check that never fails: every error becomes `exists: false`.
async fn soft_check(state: &RelayState, url: Url, auth: Option<HeaderValue>) -> PoolCheck {
    let mut builder = state
        .http
        .get(url)
        .header(header::ACCEPT, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }

    let attempt = async {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok::<_, reqwest::Error>((status, text))
    };

    match tokio::time::timeout(state.config.soft_check_timeout(), attempt).await {
        Ok(Ok((status, text))) if status.is_success() => match UpstreamBody::parse(text) {
            UpstreamBody::Json { value, .. } => PoolCheck::found(value),
            _ => PoolCheck::missing(status.as_u16()),
        },
        Ok(Ok((status, _))) => PoolCheck::missing(status.as_u16()),
        Ok(Err(e)) => {
            debug!("Soft check transport failure: {e}");
            PoolCheck::missing(0)
        }
        Err(_) => {
            debug!(
                "Soft check timed out after {}ms",
                state.config.soft_check_timeout_ms
            );
            PoolCheck::missing(0)
        }
    }
}
