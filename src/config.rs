// Command-line and environment configuration.

use crate::session::default_session_path;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PACING_MS: u64 = 90;

/// Run one command across a batch of accounts through a discovered backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "multirun", version)]
pub struct Config {
    /// Backend base URL to try before any discovered one
    #[arg(long, env = "MULTIRUN_API_BASE")]
    pub api_base: Option<String>,

    /// Origin this front-end is served from (only http/https are tried)
    #[arg(long, env = "MULTIRUN_ORIGIN")]
    pub origin: Option<String>,

    /// Timeout for health checks and dispatch requests, in seconds
    #[arg(long, env = "MULTIRUN_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Delay between streamed results, in milliseconds (0 disables it)
    #[arg(long, env = "MULTIRUN_PACING_MS", default_value_t = DEFAULT_PACING_MS)]
    pub pacing_ms: u64,

    /// Where the session (accounts, last command, backend) is kept
    #[arg(long, env = "MULTIRUN_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Run this command once and exit instead of opening the menu
    #[arg(long)]
    pub command: Option<String>,

    /// Accounts text for a one-shot run (`-` reads stdin); defaults to the
    /// saved accounts
    #[arg(long, requires = "command")]
    pub accounts_file: Option<PathBuf>,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(default_session_path)
    }
}
