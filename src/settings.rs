//! Process-wide configuration, built once from the `run` arguments and
//! shared read-only with every handler.

use std::net::SocketAddr;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::error::SfRelayError;

pub const DEFAULT_API_VERSION: &str = "v58.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY: usize = 1_048_576;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Salesforce REST API version segment, e.g. `v58.0`.
    pub api_version: String,
    /// Bound on each outbound call, response body included.
    pub timeout: Duration,
    pub host: String,
    pub port: u16,
    pub max_body: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            max_body: DEFAULT_MAX_BODY,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn from_args(args: &RunArgs) -> Self {
        Self {
            api_version: args.api_version.clone(),
            timeout: Duration::from_secs(args.timeout),
            host: args.host.clone(),
            port: args.port,
            max_body: args.max_body,
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, SfRelayError> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
