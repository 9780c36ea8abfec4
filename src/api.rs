// API client module: a small blocking HTTP client that talks to the
// command-execution backend. Two calls only: the liveness check used by
// backend discovery, and the batch `run` call that submits one command for
// every account at once.

use crate::accounts::AccountRecord;
use crate::locator::{BackendEndpoint, HealthCheck};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const HEALTH_PATH: &str = "/api/health";
const RUN_PATH: &str = "/api/run";

/// Rejected before any network activity.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("Enter a command.")]
    EmptyCommand,
    #[error("Add at least one account line: Label|.ROBLOSECURITY cookie")]
    NoAccounts,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("backend unavailable")]
    BackendUnavailable,
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },
    #[error("Unexpected response from server.")]
    MalformedResponse,
    #[error("Unexpected response from server: expected {expected} result(s), got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Payload of `POST /api/run`. Construction enforces a non-empty trimmed
/// command and at least one account.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command: String,
    accounts: Vec<AccountRecord>,
}

impl CommandRequest {
    pub fn new(command: &str, accounts: Vec<AccountRecord>) -> Result<Self, InputError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(InputError::EmptyCommand);
        }
        if accounts.is_empty() {
            return Err(InputError::NoAccounts);
        }
        Ok(CommandRequest {
            command: command.to_string(),
            accounts,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn accounts(&self) -> &[AccountRecord] {
        &self.accounts
    }
}

/// The backend's verdict for one account.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub label: String,
    pub ok: bool,
    pub message: String,
}

/// Success body of `POST /api/run`. Only `results` is read; anything else
/// the backend sends is ignored.
#[derive(Deserialize, Debug)]
struct RunResponse {
    results: Vec<ExecutionResult>,
}

/// Blocking client shared by discovery and dispatch. The timeout applies
/// to every request it sends.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient { client })
    }

    /// `GET {base}/api/health` with caching disabled. Any 2xx counts as
    /// healthy; every other status and every transport error does not.
    pub fn check_health(&self, base: &str) -> bool {
        let url = format!("{}{}", base, HEALTH_PATH);
        match self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
        {
            Ok(res) => {
                debug!(%url, status = %res.status(), "health check answered");
                res.status().is_success()
            }
            Err(error) => {
                debug!(%url, %error, "health check failed");
                false
            }
        }
    }

    /// Submit `request` to `endpoint` in a single `POST /api/run`. No
    /// retries: any failure fails the whole batch.
    pub fn dispatch(
        &self,
        endpoint: Option<&BackendEndpoint>,
        request: &CommandRequest,
    ) -> Result<Vec<ExecutionResult>, DispatchError> {
        let endpoint = endpoint.ok_or(DispatchError::BackendUnavailable)?;
        let url = format!("{}{}", endpoint.base_url(), RUN_PATH);
        debug!(
            %url,
            command = request.command(),
            accounts = request.accounts().len(),
            "dispatching batch"
        );

        let res = self.client.post(&url).json(request).send()?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().unwrap_or_default();
            warn!(%url, status, "backend rejected batch");
            return Err(DispatchError::ServerError { status, body });
        }

        let bytes = res.bytes()?;
        let parsed: RunResponse =
            serde_json::from_slice(&bytes).map_err(|_| DispatchError::MalformedResponse)?;

        let expected = request.accounts().len();
        let actual = parsed.results.len();
        if actual != expected {
            warn!(%url, expected, actual, "result count does not match account count");
            return Err(DispatchError::ResultCountMismatch { expected, actual });
        }
        Ok(parsed.results)
    }
}

impl HealthCheck for ApiClient {
    fn is_healthy(&self, base: &str) -> bool {
        self.check_health(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(label: &str) -> AccountRecord {
        AccountRecord {
            label: label.into(),
            credential: format!("{label}-cookie"),
        }
    }

    #[test]
    fn request_requires_command_and_accounts() {
        assert_eq!(
            CommandRequest::new("   ", vec![account("A")]),
            Err(InputError::EmptyCommand)
        );
        assert_eq!(
            CommandRequest::new("follow bob", Vec::new()),
            Err(InputError::NoAccounts)
        );
        let req = CommandRequest::new("  follow bob ", vec![account("A")]).unwrap();
        assert_eq!(req.command(), "follow bob");
    }

    #[test]
    fn request_serializes_credential_as_cookie() {
        let req = CommandRequest::new("follow bob", vec![account("A")]).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "command": "follow bob",
                "accounts": [{ "label": "A", "cookie": "A-cookie" }]
            })
        );
    }

    #[test]
    fn dispatch_without_endpoint_is_unavailable() {
        let client = ApiClient::new(Duration::from_secs(1)).unwrap();
        let req = CommandRequest::new("follow bob", vec![account("A")]).unwrap();
        assert!(matches!(
            client.dispatch(None, &req),
            Err(DispatchError::BackendUnavailable)
        ));
    }

    #[test]
    fn response_without_results_array_is_rejected() {
        assert!(serde_json::from_str::<RunResponse>(r#"{"ok":true}"#).is_err());
        assert!(serde_json::from_str::<RunResponse>(r#"{"results":{}}"#).is_err());
        let parsed: RunResponse = serde_json::from_str(
            r#"{"results":[{"label":"A","ok":false,"message":"rate limited"}],"extra":1}"#,
        )
        .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert!(!parsed.results[0].ok);
    }
}
