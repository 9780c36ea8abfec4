// Entrypoint for the CLI application.
// - Keeps `main` small: read config, set up logging and the session, build
//   the runner, then hand over to the menu (or run once and exit).
// - Returns `anyhow::Result` so setup failures surface with their context;
//   a failed one-shot run only sets a non-zero exit status.

use anyhow::{Context, Result};
use clap::Parser;
use multirun_cli::api::ApiClient;
use multirun_cli::config::Config;
use multirun_cli::locator::BackendLocator;
use multirun_cli::runner::BatchRunner;
use multirun_cli::session::{FileStore, SessionStore};
use multirun_cli::ui::{main_menu, run_once};
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> Result<ExitCode> {
    let config = Config::parse();

    // Logs go to stderr and stay quiet unless RUST_LOG asks for more.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let session = SessionStore::new(Arc::new(FileStore::open(config.session_path())));
    let client = ApiClient::new(config.timeout())?;
    let locator = BackendLocator::with_default_sources(
        config.api_base.clone(),
        config.origin.clone(),
        session.clone(),
    );
    let mut runner = BatchRunner::new(client, locator, config.pacing());

    let Some(command) = config.command.as_deref() else {
        main_menu(runner, session)?;
        return Ok(ExitCode::SUCCESS);
    };

    let accounts_text = match &config.accounts_file {
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read accounts from stdin")?;
            text
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read accounts file {}", path.display()))?,
        None => session.load().accounts_text,
    };
    // The failure is already on screen; only the exit status is left.
    if run_once(&mut runner, &accounts_text, command) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
