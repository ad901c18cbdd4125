//! Outbound call construction: Salesforce URL templating, request
//! headers, and credential redaction for logs.

use axum::http::{header, HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use serde_json::Value;
use url::Url;

use crate::error::ForwardError;

/// Characters of the bearer token that may appear in logs.
const TOKEN_LOG_PREFIX: usize = 10;

/// A fully built request against Salesforce. Dropped once the call returns.
#[derive(Debug)]
pub struct OutboundCall {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Truncated bearer token, safe to log.
    pub token_hint: String,
}

impl OutboundCall {
    pub fn new(
        method: Method,
        url: Url,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Self, ForwardError> {
        let headers = build_headers(token)?;
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ForwardError::Internal(format!("failed to encode request body: {e}")))?
            .map(Bytes::from);

        Ok(Self {
            method,
            url,
            headers,
            body,
            token_hint: redact_token(token),
        })
    }

    /// Origin and path of the target, without the query string.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}{}", self.url.origin().ascii_serialization(), self.url.path())
    }
}

/// `Authorization`, `Content-Type` and `Accept` for every Salesforce call.
/// The authorization value is marked sensitive so it never shows in
/// `Debug` output.
pub fn build_headers(token: &str) -> Result<HeaderMap, ForwardError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
        ForwardError::Network {
            message: format!("invalid session token: {e}"),
            kind: "InvalidHeader",
        }
    })?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(header::AUTHORIZATION, auth);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// `{instance}/services/data/{version}/{suffix}`
pub fn data_url(instance_url: &str, api_version: &str, suffix: &str) -> Result<Url, ForwardError> {
    parse_url(&format!(
        "{instance_url}/services/data/{api_version}/{suffix}"
    ))
}

/// `{instance}{endpoint}` with any trailing slash on the instance removed.
pub fn proxy_url(instance_url: &str, endpoint: &str) -> Result<Url, ForwardError> {
    parse_url(&format!(
        "{}{endpoint}",
        instance_url.trim_end_matches('/')
    ))
}

fn parse_url(raw: &str) -> Result<Url, ForwardError> {
    Url::parse(raw).map_err(|e| ForwardError::Network {
        message: format!("invalid URL '{raw}': {e}"),
        kind: "InvalidURL",
    })
}

#[must_use]
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_LOG_PREFIX).collect();
    format!("{prefix}...")
}

/// First 100 characters of a SOQL statement, for logs.
#[must_use]
pub fn truncate_soql(query: &str) -> String {
    query.chars().take(100).collect()
}

/// A proxy endpoint for logs: the path as given, with any query string
/// cut the same way SOQL is.
#[must_use]
pub fn log_endpoint(endpoint: &str) -> String {
    match endpoint.split_once('?') {
        Some((path, query)) => format!("{path}?{}", truncate_soql(query)),
        None => endpoint.to_string(),
    }
}
