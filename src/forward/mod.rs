//! The forwarder: one generic pipeline for every Salesforce operation.
//!
//! Each route describes itself as an [`Operation`]. [`forward`] then runs
//! the same steps for all of them: check required fields, build the
//! [`OutboundCall`](outbound::OutboundCall), send it through the
//! configured [`Transport`](transport::Transport) under the fixed timeout,
//! and map the upstream answer to a [`Forwarded`] result or a
//! [`ForwardError`]. Submodules hold the inbound envelope ([`payload`]),
//! request construction ([`outbound`]), the network seam ([`transport`]),
//! and the axum handlers ([`handlers`]).

pub mod handlers;
pub mod outbound;
pub mod payload;
pub mod transport;

use std::time::Instant;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::error::ForwardError;
use crate::server::AppState;
use outbound::{data_url, log_endpoint, proxy_url, truncate_soql, OutboundCall};
use payload::Payload;
use transport::UpstreamResponse;

/// How upstream bodies are surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStyle {
    /// Object routes: success bodies must be JSON, error details are
    /// reported as `{error: "Salesforce API error: N", details}`.
    Object,
    /// Generic proxy: non-JSON success bodies are returned as text, errors
    /// carry `status_code`.
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Get,
    Update,
    Delete,
}

impl RecordAction {
    pub fn from_method(method: &Method) -> Result<Self, ForwardError> {
        match *method {
            Method::GET => Ok(Self::Get),
            Method::PATCH => Ok(Self::Update),
            Method::DELETE => Ok(Self::Delete),
            _ => Err(ForwardError::UnsupportedMethod(method.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Query,
    Describe {
        object_name: String,
    },
    Create {
        object_name: String,
    },
    Record {
        action: RecordAction,
        object_name: String,
        record_id: String,
    },
    Proxy,
}

const QUERY_FIELDS: &[&str] = &["query", "instanceUrl", "sessionId"];
const SESSION_FIELDS: &[&str] = &["instanceUrl", "sessionId"];
const RECORD_DATA_FIELDS: &[&str] = &["instanceUrl", "sessionId", "recordData"];
const PROXY_FIELDS: &[&str] = &["instance_url", "endpoint", "auth_token"];

const OK_ONLY: &[StatusCode] = &[StatusCode::OK];
const OK_OR_CREATED: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED];
const OK_OR_NO_CONTENT: &[StatusCode] = &[StatusCode::OK, StatusCode::NO_CONTENT];
const ANY_SUCCESS: &[StatusCode] = &[
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::NO_CONTENT,
];

impl Operation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Describe { .. } => "describe",
            Self::Create { .. } => "create",
            Self::Record {
                action: RecordAction::Get,
                ..
            } => "record_get",
            Self::Record {
                action: RecordAction::Update,
                ..
            } => "record_update",
            Self::Record {
                action: RecordAction::Delete,
                ..
            } => "record_delete",
            Self::Proxy => "proxy",
        }
    }

    #[must_use]
    pub const fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Query => QUERY_FIELDS,
            Self::Describe { .. }
            | Self::Record {
                action: RecordAction::Get | RecordAction::Delete,
                ..
            } => SESSION_FIELDS,
            Self::Create { .. }
            | Self::Record {
                action: RecordAction::Update,
                ..
            } => RECORD_DATA_FIELDS,
            Self::Proxy => PROXY_FIELDS,
        }
    }

    #[must_use]
    pub const fn success_statuses(&self) -> &'static [StatusCode] {
        match self {
            Self::Query | Self::Describe { .. } => OK_ONLY,
            Self::Create { .. } => OK_OR_CREATED,
            Self::Record { .. } => OK_OR_NO_CONTENT,
            Self::Proxy => ANY_SUCCESS,
        }
    }

    #[must_use]
    pub const fn style(&self) -> ResponseStyle {
        match self {
            Self::Proxy => ResponseStyle::Passthrough,
            _ => ResponseStyle::Object,
        }
    }

    /// Build the outbound call. Assumes [`Payload::check`] passed; a field
    /// that still cannot be read reports the usual missing-fields error.
    pub fn outbound_call(
        &self,
        payload: &Payload,
        api_version: &str,
    ) -> Result<OutboundCall, ForwardError> {
        let missing = || ForwardError::MissingFields(self.required_fields());
        let field = |key: &str| payload.text(key).ok_or_else(missing);
        let record_data = || payload.json("recordData").ok_or_else(missing);

        let (method, suffix, body) = match self {
            Self::Proxy => return self.proxy_call(payload),
            Self::Query => (Method::GET, "query/".to_string(), None),
            Self::Describe { object_name } => (
                Method::GET,
                format!("sobjects/{object_name}/describe/"),
                None,
            ),
            Self::Create { object_name } => (
                Method::POST,
                format!("sobjects/{object_name}/"),
                Some(record_data()?),
            ),
            Self::Record {
                action,
                object_name,
                record_id,
            } => {
                let suffix = format!("sobjects/{object_name}/{record_id}");
                match action {
                    RecordAction::Get => (Method::GET, suffix, None),
                    RecordAction::Update => (Method::PATCH, suffix, Some(record_data()?)),
                    RecordAction::Delete => (Method::DELETE, suffix, None),
                }
            }
        };

        let mut url = data_url(&field("instanceUrl")?, api_version, &suffix)?;
        if *self == Self::Query {
            url.query_pairs_mut().append_pair("q", &field("query")?);
        }
        OutboundCall::new(method, url, &field("sessionId")?, body)
    }

    fn proxy_call(&self, payload: &Payload) -> Result<OutboundCall, ForwardError> {
        let field = |key: &str| {
            payload
                .text(key)
                .ok_or(ForwardError::MissingFields(self.required_fields()))
        };

        let method = payload
            .text("method")
            .unwrap_or_else(|| "GET".into())
            .to_uppercase();
        let method = match method.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            _ => return Err(ForwardError::UnsupportedMethod(method)),
        };

        let url = proxy_url(&field("instance_url")?, &field("endpoint")?)?;
        let body = match method {
            Method::POST | Method::PUT | Method::PATCH => payload.json("body"),
            _ => None,
        };
        OutboundCall::new(method, url, &field("auth_token")?, body)
    }

    /// Operation-specific context for the "forwarding" log line.
    fn log_detail(&self, payload: &Payload) -> String {
        match self {
            Self::Query => payload
                .text("query")
                .map(|q| truncate_soql(&q))
                .unwrap_or_default(),
            Self::Describe { object_name } | Self::Create { object_name } => object_name.clone(),
            Self::Record {
                object_name,
                record_id,
                ..
            } => format!("{object_name}/{record_id}"),
            Self::Proxy => payload
                .text("endpoint")
                .map(|endpoint| log_endpoint(&endpoint))
                .unwrap_or_default(),
        }
    }

    /// Turn the upstream answer into the caller's result.
    pub fn map_response(&self, upstream: UpstreamResponse) -> Result<Forwarded, ForwardError> {
        if !self.success_statuses().contains(&upstream.status) {
            return Err(ForwardError::Upstream {
                status: upstream.status.as_u16(),
                body: upstream.body,
                style: self.style(),
            });
        }

        if upstream.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Forwarded::Json(json!({ "success": true })));
        }

        match serde_json::from_slice::<Value>(&upstream.body) {
            Ok(value) => Ok(Forwarded::Json(value)),
            Err(e) => match self.style() {
                ResponseStyle::Passthrough => Ok(Forwarded::Text(
                    String::from_utf8_lossy(&upstream.body).into_owned(),
                )),
                ResponseStyle::Object => Err(ForwardError::Internal(format!(
                    "invalid JSON from Salesforce: {e}"
                ))),
            },
        }
    }
}

/// Successful result, always returned with status 200.
#[derive(Debug, Clone, PartialEq)]
pub enum Forwarded {
    Json(Value),
    Text(String),
}

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        match self {
            Self::Json(value) => Json(value).into_response(),
            Self::Text(text) => text.into_response(),
        }
    }
}

/// Run one operation end to end.
pub async fn forward(
    state: &AppState,
    op: &Operation,
    payload: &Payload,
    correlation_id: &str,
) -> Result<Forwarded, ForwardError> {
    payload.check(op.required_fields())?;
    let call = op.outbound_call(payload, &state.settings.api_version)?;

    tracing::info!(
        correlation_id = %correlation_id,
        operation = op.name(),
        method = %call.method,
        target = %call.target(),
        detail = %op.log_detail(payload),
        session = %call.token_hint,
        "forwarding to salesforce"
    );

    let start = Instant::now();
    let upstream = state.transport.send(call, state.settings.timeout).await?;

    tracing::info!(
        correlation_id = %correlation_id,
        operation = op.name(),
        status = upstream.status.as_u16(),
        latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "salesforce responded"
    );

    let forwarded = op.map_response(upstream)?;
    if let Forwarded::Json(ref value) = forwarded {
        log_summary(op, value, correlation_id);
    }
    Ok(forwarded)
}

fn log_summary(op: &Operation, value: &Value, correlation_id: &str) {
    match op {
        Operation::Query => {
            let records = value.get("totalSize").and_then(Value::as_u64).unwrap_or(0);
            tracing::info!(
                correlation_id = %correlation_id,
                records,
                "query successful"
            );
        }
        Operation::Describe { object_name } => {
            let fields = value.get("fields").and_then(Value::as_array).map_or(0, Vec::len);
            tracing::info!(
                correlation_id = %correlation_id,
                object = %object_name,
                fields,
                "describe successful"
            );
        }
        Operation::Create { object_name } => {
            let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
            tracing::info!(
                correlation_id = %correlation_id,
                object = %object_name,
                id,
                "record created"
            );
        }
        Operation::Record { .. } | Operation::Proxy => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::transport::{Transport, TransportError};
    use super::*;
    use crate::settings::Settings;

    /// Records every call it receives and answers with a canned result.
    struct Recording {
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<(Method, String, Option<String>)>>>,
        reply: fn() -> Result<UpstreamResponse, TransportError>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn send(
            &self,
            call: OutboundCall,
            _timeout: Duration,
        ) -> Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let auth = call
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            self.seen
                .lock()
                .unwrap()
                .push((call.method, call.url.to_string(), auth));
            (self.reply)()
        }
    }

    type Seen = Arc<Mutex<Vec<(Method, String, Option<String>)>>>;

    fn state_with(
        reply: fn() -> Result<UpstreamResponse, TransportError>,
    ) -> (AppState, Arc<AtomicUsize>, Seen) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let transport = Recording {
            calls: Arc::clone(&calls),
            seen: Arc::clone(&seen),
            reply,
        };
        let state = AppState::new(Settings::default(), Box::new(transport));
        (state, calls, seen)
    }

    fn ok_json() -> Result<UpstreamResponse, TransportError> {
        Ok(UpstreamResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(br#"{"totalSize":1,"records":[{"Id":"001"}]}"#),
        })
    }

    fn no_content() -> Result<UpstreamResponse, TransportError> {
        Ok(UpstreamResponse {
            status: StatusCode::NO_CONTENT,
            body: Bytes::new(),
        })
    }

    fn timeout() -> Result<UpstreamResponse, TransportError> {
        Err(TransportError::Timeout(Duration::from_secs(30)))
    }

    fn payload(raw: &str) -> Payload {
        Payload::from_body(raw.as_bytes())
    }

    #[tokio::test]
    async fn missing_fields_never_reach_transport() {
        let (state, calls, _) = state_with(ok_json);
        let op = Operation::Create {
            object_name: "Account".into(),
        };
        let body = payload(r#"{"instanceUrl":"https://x.my.salesforce.com","sessionId":"abc"}"#);

        let err = forward(&state, &op, &body, "cid").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: instanceUrl, sessionId, recordData"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn query_builds_encoded_url_and_bearer_header() {
        let (state, calls, seen) = state_with(ok_json);
        let body = payload(
            r#"{"query":"SELECT Id FROM Account","instanceUrl":"https://x.my.salesforce.com","sessionId":"abc123"}"#,
        );

        let result = forward(&state, &Operation::Query, &body, "cid").await.unwrap();
        assert_eq!(
            result,
            Forwarded::Json(json!({"totalSize":1,"records":[{"Id":"001"}]}))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let seen = seen.lock().unwrap();
        let (method, url, auth) = &seen[0];
        assert_eq!(*method, Method::GET);
        assert_eq!(
            url,
            "https://x.my.salesforce.com/services/data/v58.0/query/?q=SELECT+Id+FROM+Account"
        );
        assert_eq!(auth.as_deref(), Some("Bearer abc123"));
    }

    #[tokio::test]
    async fn record_delete_without_body_is_success_sentinel() {
        let (state, _, seen) = state_with(no_content);
        let op = Operation::Record {
            action: RecordAction::Delete,
            object_name: "Contact".into(),
            record_id: "003xx".into(),
        };
        let body = payload(r#"{"instanceUrl":"https://x.my.salesforce.com","sessionId":"abc"}"#);

        let result = forward(&state, &op, &body, "cid").await.unwrap();
        assert_eq!(result, Forwarded::Json(json!({ "success": true })));
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, Method::DELETE);
        assert_eq!(
            seen[0].1,
            "https://x.my.salesforce.com/services/data/v58.0/sobjects/Contact/003xx"
        );
    }

    #[tokio::test]
    async fn record_update_requires_record_data() {
        let (state, calls, _) = state_with(no_content);
        let op = Operation::Record {
            action: RecordAction::Update,
            object_name: "Contact".into(),
            record_id: "003xx".into(),
        };
        let body = payload(r#"{"instanceUrl":"https://x.my.salesforce.com","sessionId":"abc"}"#);

        let err = forward(&state, &op, &body, "cid").await.unwrap_err();
        assert!(matches!(err, ForwardError::MissingFields(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn timeout_surfaces_as_timeout_error() {
        let (state, _, _) = state_with(timeout);
        let body = payload(r#"{"instanceUrl":"https://x.my.salesforce.com","sessionId":"abc"}"#);
        let op = Operation::Describe {
            object_name: "Account".into(),
        };

        let err = forward(&state, &op, &body, "cid").await.unwrap_err();
        assert!(matches!(err, ForwardError::Timeout));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn proxy_rejects_unknown_method_before_sending() {
        let (state, calls, _) = state_with(ok_json);
        let body = payload(
            r#"{"instance_url":"https://x.my.salesforce.com","endpoint":"/services/data/","auth_token":"t","method":"trace"}"#,
        );

        let err = forward(&state, &Operation::Proxy, &body, "cid").await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported HTTP method: TRACE");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn proxy_defaults_to_get_and_joins_endpoint() {
        let (state, _, seen) = state_with(ok_json);
        let body = payload(
            r#"{"instance_url":"https://x.my.salesforce.com/","endpoint":"/services/data/v58.0/limits","auth_token":"tok"}"#,
        );

        forward(&state, &Operation::Proxy, &body, "cid").await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, Method::GET);
        assert_eq!(
            seen[0].1,
            "https://x.my.salesforce.com/services/data/v58.0/limits"
        );
        assert_eq!(seen[0].2.as_deref(), Some("Bearer tok"));
    }

    #[test]
    fn proxy_returns_text_for_non_json_success() {
        let upstream = UpstreamResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(b"<html>ok</html>"),
        };
        let result = Operation::Proxy.map_response(upstream).unwrap();
        assert_eq!(result, Forwarded::Text("<html>ok</html>".into()));
    }

    #[test]
    fn object_route_rejects_non_json_success() {
        let upstream = UpstreamResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(b"<html>ok</html>"),
        };
        let err = Operation::Query.map_response(upstream).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn query_treats_created_as_upstream_error() {
        let upstream = UpstreamResponse {
            status: StatusCode::CREATED,
            body: Bytes::from_static(b"{}"),
        };
        let err = Operation::Query.map_response(upstream).unwrap_err();
        assert_eq!(err.status(), StatusCode::CREATED);
    }

    #[test]
    fn create_accepts_created() {
        let upstream = UpstreamResponse {
            status: StatusCode::CREATED,
            body: Bytes::from_static(br#"{"id":"001xx","success":true,"errors":[]}"#),
        };
        let op = Operation::Create {
            object_name: "Account".into(),
        };
        assert_eq!(
            op.map_response(upstream).unwrap(),
            Forwarded::Json(json!({"id":"001xx","success":true,"errors":[]}))
        );
    }

    #[test]
    fn record_action_follows_method() {
        assert_eq!(
            RecordAction::from_method(&Method::PATCH).unwrap(),
            RecordAction::Update
        );
        assert!(RecordAction::from_method(&Method::PUT).is_err());
    }

    #[test]
    fn success_summaries_read_salesforce_fields() {
        let describe = Operation::Describe {
            object_name: "Account".into(),
        };
        let create = Operation::Create {
            object_name: "Account".into(),
        };
        log_summary(&Operation::Query, &json!({"totalSize": 3, "records": []}), "cid");
        log_summary(&describe, &json!({"fields": [{"name": "Id"}]}), "cid");
        log_summary(&create, &json!({"id": "001xx", "success": true}), "cid");
        log_summary(&Operation::Query, &json!({"unexpected": true}), "cid");
    }

    #[test]
    fn proxy_log_detail_truncates_endpoint_query() {
        let soql = "SELECT Id FROM Account WHERE Name = 'a' ".repeat(10);
        let raw = format!(
            r#"{{"instance_url":"https://x.my.salesforce.com","auth_token":"abc","endpoint":"/services/data/v58.0/query/?q={soql}"}}"#
        );
        let detail = Operation::Proxy.log_detail(&payload(&raw));
        assert!(detail.starts_with("/services/data/v58.0/query/?q=SELECT Id"));
        assert!(detail.len() < raw.len());
        assert!(!detail.contains(&soql));
    }
}
