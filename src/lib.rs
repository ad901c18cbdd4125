//! sfrelay is a stateless HTTP forwarder for the Salesforce REST API.
//!
//! Browser code cannot call Salesforce directly because of CORS. sfrelay
//! accepts the caller's instance URL and session token in a JSON body,
//! builds the matching Salesforce request (URL templating, bearer
//! authorization, JSON headers), executes it under a fixed timeout, and
//! returns the result as JSON with permissive CORS headers. Nothing is
//! stored between requests.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, health).
//! - [`error`] -- Startup errors and the per-request [`ForwardError`](error::ForwardError).
//! - [`forward`] -- The forwarder: operations, outbound calls, transport, handlers.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- CORS and panic-recovery layers.
//! - [`server`] -- Axum router, shared state, HTTP client, graceful shutdown.
//! - [`settings`] -- Immutable process configuration.
//! - [`status`] -- `GET /`, `GET /debug`, and the JSON 404 fallback.

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod error;
pub mod forward;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod status;
