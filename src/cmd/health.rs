//! `sfrelay health`: ask a running relay for its status payload.
//!
//! Prints the Salesforce API version the relay targets and the routes it
//! forwards, or the raw payload with `--json`.

use std::fmt::Write as _;
use std::time::Duration;

use axum::http::StatusCode;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};

use crate::cli::HealthArgs;
use crate::error::SfRelayError;
use crate::server::build_http_client;
use crate::status::IndexResponse;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn execute(args: HealthArgs) -> Result<(), SfRelayError> {
    let base = args.url.trim_end_matches('/');
    let (status, body) = fetch_index(base).await?;
    if !status.is_success() {
        return Err(SfRelayError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<IndexResponse>(&body) {
        Ok(index) => print!("{}", render(&index, base)),
        Err(e) => {
            eprintln!("{base} answered, but not with an sfrelay status payload: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }
    Ok(())
}

/// `GET {base}/` through the same rustls client the relay forwards with,
/// so `https://` deployments can be checked too.
async fn fetch_index(base: &str) -> Result<(StatusCode, Bytes), SfRelayError> {
    let uri: hyper::Uri = format!("{base}/")
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| SfRelayError::UriParse {
            source: Box::new(e),
        })?;
    let req = hyper::Request::builder()
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .map_err(|e| SfRelayError::HttpRequest {
            source: Box::new(e),
        })?;

    let exchange = async {
        let response = build_http_client()
            .request(req)
            .await
            .map_err(|e| SfRelayError::HttpRequest {
                source: Box::new(e),
            })?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| SfRelayError::HttpRequest {
                source: Box::new(e),
            })?
            .to_bytes();
        Ok::<_, SfRelayError>((status, body))
    };

    tokio::time::timeout(HEALTH_TIMEOUT, exchange)
        .await
        .map_err(|_| SfRelayError::HttpRequest {
            source: format!("no answer from {base} within {}s", HEALTH_TIMEOUT.as_secs()).into(),
        })?
}

fn render(index: &IndexResponse, base: &str) -> String {
    let mut out = format!(
        "\u{2713} {} is {} at {base}\n  sfrelay {}, Salesforce API {}, up {}\n",
        index.service,
        index.status,
        index.version,
        index.api_version,
        format_uptime(index.uptime_seconds),
    );
    if index.endpoints.is_empty() {
        out.push_str("  no forwarding routes registered\n");
    } else {
        let _ = writeln!(out, "  forwarding {} routes:", index.endpoints.len());
        for endpoint in &index.endpoints {
            let _ = writeln!(out, "    {endpoint}");
        }
    }
    out
}

fn format_uptime(seconds: u64) -> String {
    match (seconds / 86_400, seconds % 86_400 / 3600, seconds % 3600 / 60) {
        (0, 0, 0) => format!("{seconds}s"),
        (0, 0, m) => format!("{m}m {}s", seconds % 60),
        (0, h, m) => format!("{h}h {m}m"),
        (d, h, _) => format!("{d}d {h}h"),
    }
}
