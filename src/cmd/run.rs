//! `sfrelay run` — start the proxy server.
//!
//! Builds the immutable [`Settings`], initializes logging, and serves the
//! Axum router until Ctrl+C / SIGTERM.

use std::sync::Arc;

use crate::cli::RunArgs;
use crate::error::SfRelayError;
use crate::logging;
use crate::server::{self, AppState};
use crate::settings::Settings;

pub async fn execute(args: RunArgs) -> Result<(), SfRelayError> {
    logging::init(&args.log_level, logging::resolve_format(args.pretty, args.json));

    let settings = Settings::from_args(&args);
    let addr = settings.listen_addr()?;
    let api_version = settings.api_version.clone();
    let timeout_secs = settings.timeout.as_secs();

    let state = Arc::new(AppState::with_http_client(settings));
    let router = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        api_version = %api_version,
        timeout_secs,
        "sfrelay started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("sfrelay stopped");
    Ok(())
}
