//! Inbound request envelope.
//!
//! A [`Payload`] is the caller's JSON object (instance URL, session token,
//! operation fields). It lives for one request and is never stored.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::ForwardError;

#[derive(Debug, Default, Clone)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Parse a request body. Anything that is not a JSON object (empty
    /// body, malformed JSON, arrays) yields an empty payload, which then
    /// fails validation with the usual missing-fields error.
    #[must_use]
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// Fill fields absent from the body with query-string parameters.
    /// Browsers cannot attach a body to `GET`, so record reads carry
    /// credentials in the query string instead.
    #[must_use]
    pub fn with_query_fallback(mut self, params: HashMap<String, String>) -> Self {
        for (key, value) in params {
            self.0.entry(key).or_insert(Value::String(value));
        }
        self
    }

    /// A field is present when its key exists with a non-null value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn check(&self, required: &'static [&'static str]) -> Result<(), ForwardError> {
        if required.iter().all(|field| self.has(field)) {
            Ok(())
        } else {
            Err(ForwardError::MissingFields(required))
        }
    }

    /// String view of a field. Non-string scalars use their JSON text.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    #[must_use]
    pub fn json(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_body_is_empty() {
        let payload = Payload::from_body(b"{not json");
        assert!(!payload.has("instanceUrl"));
        let payload = Payload::from_body(b"[1, 2]");
        assert!(!payload.has("instanceUrl"));
    }

    #[test]
    fn null_counts_as_missing() {
        let payload = Payload::from_body(br#"{"instanceUrl": null, "sessionId": "abc"}"#);
        assert!(!payload.has("instanceUrl"));
        assert!(payload.has("sessionId"));
        let err = payload.check(&["instanceUrl", "sessionId"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: instanceUrl, sessionId"
        );
    }

    #[test]
    fn query_fallback_never_overrides_body() {
        let mut params = HashMap::new();
        params.insert("sessionId".to_string(), "from-query".to_string());
        params.insert("instanceUrl".to_string(), "https://q.example.com".to_string());
        let payload =
            Payload::from_body(br#"{"sessionId": "from-body"}"#).with_query_fallback(params);
        assert_eq!(payload.text("sessionId").as_deref(), Some("from-body"));
        assert_eq!(
            payload.text("instanceUrl").as_deref(),
            Some("https://q.example.com")
        );
    }

    #[test]
    fn scalar_text_uses_json_rendering() {
        let payload = Payload::from_body(br#"{"query": 42, "flag": true}"#);
        assert_eq!(payload.text("query").as_deref(), Some("42"));
        assert_eq!(payload.text("flag").as_deref(), Some("true"));
        assert_eq!(payload.text("absent"), None);
    }
}
