// Orchestration of one operator run: validate input, find a backend,
// dispatch the batch, then stream the per-account results back. Every
// failure ends up as a `RunError` plus operator notices; nothing panics
// and nothing is retried automatically.

use crate::accounts::parse_accounts;
use crate::api::{ApiClient, CommandRequest, DispatchError, InputError};
use crate::locator::{BackendEndpoint, BackendLocator, Resolution};
use crate::progress::{
    ProgressEvent, ProgressReporter, BACKEND_RESOLVED, DISPATCH_COMPLETE, RUN_STARTED,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Muted,
    Ok,
    Error,
}

/// Everything the UI gets to see while a run is in progress, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Notice { level: NoticeLevel, text: String },
    Progress(u8),
    Result(ProgressEvent),
}

impl RunEvent {
    fn notice(level: NoticeLevel, text: impl Into<String>) -> Self {
        RunEvent::Notice {
            level,
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Cannot reach backend. Make sure the backend server is running.")]
    BackendUnreachable,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Outcome of a run whose dispatch succeeded. Individual accounts may
/// still have failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub backend: String,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct BatchRunner {
    client: ApiClient,
    locator: BackendLocator,
    reporter: ProgressReporter,
}

impl BatchRunner {
    pub fn new(client: ApiClient, locator: BackendLocator, pacing: Duration) -> Self {
        BatchRunner {
            client,
            locator,
            reporter: ProgressReporter::new(DISPATCH_COMPLETE, pacing),
        }
    }

    pub fn locator(&self) -> &BackendLocator {
        &self.locator
    }

    /// Resolve a backend, reporting what happened through `on_event`.
    pub fn discover<F>(&mut self, on_event: &mut F) -> Option<BackendEndpoint>
    where
        F: FnMut(RunEvent),
    {
        if self.locator.current().is_none() {
            on_event(RunEvent::notice(NoticeLevel::Muted, "Scanning for backend..."));
        }
        match self.locator.resolve(&self.client) {
            Some((endpoint, how)) => {
                match how {
                    Resolution::Reused => {
                        let age = endpoint.verified_at().elapsed().unwrap_or_default();
                        debug!(
                            base = endpoint.base_url(),
                            verified_secs_ago = age.as_secs(),
                            "reusing verified backend"
                        );
                    }
                    Resolution::Saved => on_event(RunEvent::notice(
                        NoticeLevel::Ok,
                        format!("Using saved backend: {}", endpoint.base_url()),
                    )),
                    Resolution::Discovered => on_event(RunEvent::notice(
                        NoticeLevel::Ok,
                        format!("Connected to backend at {}", endpoint.base_url()),
                    )),
                }
                Some(endpoint)
            }
            None => {
                on_event(RunEvent::notice(
                    NoticeLevel::Error,
                    RunError::BackendUnreachable.to_string(),
                ));
                None
            }
        }
    }

    /// Run `command` once for every account in `accounts_text`.
    ///
    /// Input problems are reported before any network traffic. Once the
    /// dispatch succeeds the run counts as completed, whatever the
    /// individual account results say.
    pub fn run<F>(
        &mut self,
        accounts_text: &str,
        command: &str,
        mut on_event: F,
    ) -> Result<RunSummary, RunError>
    where
        F: FnMut(RunEvent),
    {
        let request = CommandRequest::new(command, parse_accounts(accounts_text))?;

        on_event(RunEvent::Progress(RUN_STARTED));
        let endpoint = self
            .discover(&mut on_event)
            .ok_or(RunError::BackendUnreachable)?;
        on_event(RunEvent::Progress(BACKEND_RESOLVED));

        on_event(RunEvent::notice(
            NoticeLevel::Muted,
            format!(
                "Running \"{}\" for {} account(s)...",
                request.command(),
                request.accounts().len()
            ),
        ));

        let results = match self.client.dispatch(Some(&endpoint), &request) {
            Ok(results) => results,
            Err(error) => {
                warn!(base = endpoint.base_url(), %error, "dispatch failed");
                self.locator.invalidate();
                on_event(RunEvent::notice(NoticeLevel::Error, error.to_string()));
                return Err(error.into());
            }
        };
        on_event(RunEvent::Progress(DISPATCH_COMPLETE));

        let mut summary = RunSummary {
            backend: endpoint.base_url().to_string(),
            succeeded: 0,
            failed: 0,
        };
        self.reporter.stream(&results, |evt| {
            if evt.ok {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            on_event(RunEvent::Result(evt));
        });

        info!(
            backend = %summary.backend,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "run completed"
        );
        on_event(RunEvent::notice(NoticeLevel::Ok, "Done!"));
        Ok(summary)
    }
}
