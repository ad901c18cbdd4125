//! Tower middleware shared by every route.
//!
//! [`cors_layer`] answers browser preflights before routing and marks all
//! other responses as readable from any origin. [`panic_response`] turns a
//! handler panic into the generic JSON 500, and [`json_payload_too_large`]
//! gives the body-limit rejection a JSON body.

use std::any::Any;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Wildcard origin, no credentials.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(PREFLIGHT_MAX_AGE)
}

#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = %detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "message": "Please check the server logs for more details",
        })),
    )
        .into_response()
}

/// Rewrite a 413 into `{"error", "message"}` JSON. Both the early
/// `Content-Length` check and the streaming limit answer in plain text.
pub async fn json_payload_too_large(response: Response) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    let body = Json(json!({
        "error": "Request body too large",
        "message": "The request body exceeds the configured size limit",
    }))
    .into_response()
    .into_body();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, body)
}
