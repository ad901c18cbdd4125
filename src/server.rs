//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared, read-only state holding the
//! settings and outbound transport), [`build_router`] for the route table
//! and middleware stack, [`build_http_client`] for the connection-pooled
//! hyper client, and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::forward::handlers;
use crate::forward::transport::{HyperTransport, Transport};
use crate::middleware;
use crate::settings::Settings;
use crate::status;

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

/// Registered endpoints as `(method, path, description)`. Feeds the
/// status payload, `/debug`, and the 404 listing.
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/", "Health check"),
    ("GET", "/debug", "Build and route introspection"),
    ("POST", "/api/query", "Execute SOQL query"),
    ("POST", "/api/describe/<object_name>", "Get object metadata"),
    ("POST", "/api/sobjects/<object_name>", "Create record"),
    ("GET", "/api/sobjects/<object_name>/<record_id>", "Get record"),
    ("PATCH", "/api/sobjects/<object_name>/<record_id>", "Update record"),
    ("DELETE", "/api/sobjects/<object_name>/<record_id>", "Delete record"),
    ("POST", "/api/proxy", "General proxy for any Salesforce API call"),
];

pub struct AppState {
    pub settings: Settings,
    pub transport: Box<dyn Transport>,
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(settings: Settings, transport: Box<dyn Transport>) -> Self {
        Self {
            settings,
            transport,
            start_time: Instant::now(),
        }
    }

    /// State backed by the real hyper client.
    #[must_use]
    pub fn with_http_client(settings: Settings) -> Self {
        Self::new(settings, Box::new(HyperTransport::new(build_http_client())))
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body = state.settings.max_body;
    Router::new()
        .route("/", get(status::index_handler))
        .route("/debug", get(status::debug_handler))
        .route("/api/query", post(handlers::query))
        .route("/api/describe/{object_name}", post(handlers::describe))
        .route("/api/sobjects/{object_name}", post(handlers::create_record))
        .route(
            "/api/sobjects/{object_name}/{record_id}",
            get(handlers::record)
                .patch(handlers::record)
                .delete(handlers::record),
        )
        .route("/api/proxy", post(handlers::proxy))
        .fallback(status::not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors_layer())
                .layer(CatchPanicLayer::custom(middleware::panic_response))
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .layer(axum::middleware::map_response(
            middleware::json_payload_too_large,
        ))
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
