//! Runtime settings
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Environment variables: `LOGSERVER_*`
//! 3. Global command-line flags
//!
//! Steps 2 and 3 are resolved by clap; this module fills in defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// Connect/read timeout for every exchange with the logserver.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const APP_DIR: &str = "logserver-client";
const STORE_FILE: &str = "tokens.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Snapshot file of the token store.
    pub store_path: PathBuf,
    /// Talk plain HTTP instead of HTTPS.
    pub plain_http: bool,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            plain_http: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();
        Self {
            store_path: cli.store.clone().unwrap_or(defaults.store_path),
            plain_http: cli.plain_http,
            timeout: cli
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// `<data_dir>/logserver-client/tokens.json`, or the working directory when
/// the platform has no data directory.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORE_FILE)
}
