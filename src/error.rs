//! Unified error types for sfrelay.
//!
//! [`SfRelayError`] covers startup and CLI failures. [`ForwardError`] is
//! the per-request error of the forwarder: every variant maps to exactly
//! one status code and JSON body through its [`IntoResponse`] impl, so
//! nothing escapes a handler unconverted.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::forward::transport::TransportError;
use crate::forward::ResponseStyle;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SfRelayError {
    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}

const EGRESS_MESSAGE: &str =
    "The hosting environment does not allow outbound HTTPS requests to Salesforce.";
const EGRESS_SOLUTION: &str =
    "Allow egress to the Salesforce instance domain, or deploy on a host with unrestricted outbound access";

/// Failure of a single forwarded operation.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// One or more required payload fields are absent. Carries the full
    /// list of fields the operation requires.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(&'static [&'static str]),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Salesforce answered with a status outside the operation's success set.
    #[error("Salesforce API error: {status}")]
    Upstream {
        status: u16,
        body: Bytes,
        style: ResponseStyle,
    },

    #[error("Request timeout")]
    Timeout,

    #[error("External API access restricted: {details}")]
    EgressRestricted { details: String },

    #[error("Network error ({kind}): {message}")]
    Network { message: String, kind: &'static str },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ForwardError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields(_) | Self::UnsupportedMethod(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::EgressRestricted { .. } => StatusCode::FORBIDDEN,
            Self::Network { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-side mistakes are logged at `warn`, everything else at `error`.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingFields(_) | Self::UnsupportedMethod(_))
    }

    fn body(&self) -> Value {
        match self {
            Self::MissingFields(_) | Self::UnsupportedMethod(_) | Self::Timeout => {
                json!({ "error": self.to_string() })
            }
            Self::Upstream {
                status,
                body,
                style,
            } => upstream_body(*status, body, *style),
            Self::EgressRestricted { details } => json!({
                "error": "External API access restricted",
                "message": EGRESS_MESSAGE,
                "details": details,
                "solution": EGRESS_SOLUTION,
            }),
            Self::Network { message, kind } => json!({
                "error": "Network error",
                "message": message,
                "type": kind,
            }),
            Self::Internal(message) => json!({
                "error": format!("Internal server error: {message}"),
            }),
        }
    }
}

fn upstream_body(status: u16, body: &Bytes, style: ResponseStyle) -> Value {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    let text = || String::from_utf8_lossy(body).into_owned();
    match style {
        ResponseStyle::Object => json!({
            "error": format!("Salesforce API error: {status}"),
            "details": parsed.unwrap_or_else(|| Value::String(text())),
        }),
        ResponseStyle::Passthrough => match parsed {
            Some(details) => json!({
                "error": "Salesforce API error",
                "status_code": status,
                "details": details,
            }),
            None => json!({
                "error": "Salesforce API error",
                "status_code": status,
                "message": text(),
            }),
        },
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<TransportError> for ForwardError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => Self::Timeout,
            TransportError::InvalidRequest(message) => Self::Network {
                message,
                kind: "InvalidRequest",
            },
            TransportError::Connection(source) => {
                let message = error_chain(source.as_ref());
                if is_permission_denied(source.as_ref()) {
                    Self::EgressRestricted { details: message }
                } else {
                    Self::Network {
                        message,
                        kind: "ConnectionError",
                    }
                }
            }
            TransportError::Body(source) => Self::Network {
                message: error_chain(source.as_ref()),
                kind: "BodyError",
            },
        }
    }
}

/// True when any error in the chain is an `io::Error` of kind
/// `PermissionDenied`, which is how sandboxed hosts surface blocked egress.
fn is_permission_denied(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::PermissionDenied {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Render an error and all of its sources as `outer: inner: root`.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        let part = e.to_string();
        if !message.ends_with(&part) {
            message.push_str(": ");
            message.push_str(&part);
        }
        current = e.source();
    }
    message
}
