//! Outbound HTTP transport.
//!
//! [`Transport`] is the seam between the forwarder and the network. The
//! production [`HyperTransport`] sends through the shared hyper client,
//! following redirects; tests substitute recording mocks.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use tower::ServiceExt;
use tower_http::follow_redirect::FollowRedirect;

use super::outbound::OutboundCall;
use crate::server::HttpClient;

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("outbound request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to read upstream body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
}

// async_trait is required here because Transport is held as Box<dyn Transport>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one call. The timeout bounds the whole exchange, response
    /// body included. No retries.
    async fn send(
        &self,
        call: OutboundCall,
        timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError>;
}

/// Sends through the pooled client. Up to 20 redirects are followed;
/// `Authorization` is dropped when a redirect leaves the origin.
pub struct HyperTransport {
    client: FollowRedirect<HttpClient>,
}

impl HyperTransport {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client: FollowRedirect::new(client),
        }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(
        &self,
        call: OutboundCall,
        timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError> {
        let uri: hyper::Uri = call
            .url
            .as_str()
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| {
                TransportError::InvalidRequest(e.to_string())
            })?;

        let mut builder = hyper::Request::builder().method(call.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(call.headers);
        }
        let req = builder
            .body(Full::new(call.body.unwrap_or_default()))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let exchange = async {
            let response = self
                .client
                .clone()
                .oneshot(req)
                .await
                .map_err(|e| TransportError::Connection(Box::new(e)))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::Body(Box::new(e)))?
                .to_bytes();
            Ok::<_, TransportError>(UpstreamResponse { status, body })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }
}
