//! Router configuration for the relay.
//!
//! Sets up routes and middleware: CORS, panic catching and tracing.
//! Unknown routes answer with a JSON 404.

use std::any::Any;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use super::handler;
use super::state::RelayState;
use super::upstream::JsonReply;

/// Largest accepted upload (multipart file forwarding).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Allowed CORS request headers.
pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Allowed CORS methods.
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Create the relay router with all routes and middleware.
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/relay", any(handler::relay))
        .fallback(handler::not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(cors_methods())
        .allow_headers(cors_headers())
}

fn cors_methods() -> Vec<Method> {
    CORS_ALLOW_METHODS
        .split(',')
        .filter_map(|m| m.trim().parse().ok())
        .collect()
}

fn cors_headers() -> Vec<HeaderName> {
    CORS_ALLOW_HEADERS
        .split(',')
        .filter_map(|h| h.trim().parse().ok())
        .collect()
}

/// Last-resort handler: a panic inside the relay still answers with JSON.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal relay error".to_string()
    };
    error!("Relay handler panicked: {message}");
    JsonReply::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({ "error": message }),
    )
    .into_response()
}
