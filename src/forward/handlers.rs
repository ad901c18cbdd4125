//! Axum handlers for the `/api/*` routes.
//!
//! Each handler only turns the request into an [`Operation`] plus a
//! [`Payload`]; [`dispatch`] runs the shared pipeline, logs failures,
//! and stamps the correlation id on the response.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};

use super::payload::Payload;
use super::{forward, Operation, RecordAction};
use crate::server::AppState;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

pub async fn query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state, Operation::Query, Payload::from_body(&body), &headers).await
}

pub async fn describe(
    State(state): State<Arc<AppState>>,
    Path(object_name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let op = Operation::Describe { object_name };
    dispatch(&state, op, Payload::from_body(&body), &headers).await
}

pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Path(object_name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let op = Operation::Create { object_name };
    dispatch(&state, op, Payload::from_body(&body), &headers).await
}

pub async fn record(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path((object_name, record_id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = correlation_id(&headers);
    let action = match RecordAction::from_method(&method) {
        Ok(action) => action,
        Err(e) => return with_correlation(e.into_response(), &correlation_id),
    };
    let op = Operation::Record {
        action,
        object_name,
        record_id,
    };
    let payload = Payload::from_body(&body).with_query_fallback(params);
    dispatch(&state, op, payload, &headers).await
}

pub async fn proxy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state, Operation::Proxy, Payload::from_body(&body), &headers).await
}

async fn dispatch(state: &AppState, op: Operation, payload: Payload, headers: &HeaderMap) -> Response {
    let correlation_id = correlation_id(headers);

    let response = match forward(state, &op, &payload, &correlation_id).await {
        Ok(forwarded) => forwarded.into_response(),
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    operation = op.name(),
                    error = %e,
                    "rejected request"
                );
            } else {
                tracing::error!(
                    correlation_id = %correlation_id,
                    operation = op.name(),
                    status = e.status().as_u16(),
                    error = %e,
                    "operation failed"
                );
            }
            e.into_response()
        }
    };

    with_correlation(response, &correlation_id)
}

/// Reuse the caller's `x-correlation-id`, or mint a fresh UUID.
fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from)
}

fn with_correlation(mut response: Response, correlation_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}
