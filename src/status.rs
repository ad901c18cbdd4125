//! Service status endpoints.
//!
//! `GET /` returns an [`IndexResponse`] (health plus the endpoint list),
//! `GET /debug` a [`DebugResponse`] with build metadata and registered
//! routes, and the router fallback a JSON 404 listing what exists.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::{AppState, ENDPOINTS};

pub const SERVICE_NAME: &str = "Salesforce API Proxy";

#[derive(Serialize, Deserialize)]
pub struct IndexResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub api_version: String,
    pub uptime_seconds: u64,
    pub endpoints: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct DebugResponse {
    pub status: String,
    pub version: String,
    pub git_commit: String,
    pub rustc_version: String,
    pub build_profile: String,
    pub target: String,
    pub registered_routes: Vec<String>,
    pub cors_enabled: bool,
}

#[derive(Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub error: String,
    pub available_endpoints: Vec<String>,
}

pub async fn index_handler(State(state): State<Arc<AppState>>) -> Json<IndexResponse> {
    let mut endpoints: Vec<String> = ENDPOINTS
        .iter()
        .filter(|(_, path, _)| path.starts_with("/api/"))
        .map(|(_, path, _)| (*path).to_string())
        .collect();
    endpoints.dedup();

    Json(IndexResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: state.settings.api_version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        endpoints,
    })
}

pub async fn debug_handler() -> Json<DebugResponse> {
    Json(DebugResponse {
        status: "sfrelay is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_commit: env!("SFRELAY_GIT_SHORT").to_string(),
        rustc_version: env!("SFRELAY_RUSTC_VERSION").to_string(),
        build_profile: env!("SFRELAY_BUILD_PROFILE").to_string(),
        target: env!("SFRELAY_TARGET").to_string(),
        registered_routes: ENDPOINTS
            .iter()
            .map(|(method, path, _)| format!("{method} {path}"))
            .collect(),
        cors_enabled: true,
    })
}

pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Endpoint not found".to_string(),
            available_endpoints: ENDPOINTS
                .iter()
                .filter(|(_, path, _)| *path != "/debug")
                .map(|(method, path, description)| format!("{method} {path} - {description}"))
                .collect(),
        }),
    )
}
