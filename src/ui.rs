// UI layer: an interactive menu built on `dialoguer`, plus the one-shot
// mode used when a command is passed on the command line. Run output is
// printed above an `indicatif` progress bar, coloured with `crossterm`.

use crate::accounts::parse_accounts;
use crate::api::DispatchError;
use crate::progress::ProgressEvent;
use crate::runner::{BatchRunner, NoticeLevel, RunError, RunEvent};
use crate::session::SessionStore;
use anyhow::Result;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor::MoveTo, execute};
use dialoguer::{Confirm, Editor, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::stdout;

/// Canned commands offered by "Pick example command".
pub const EXAMPLE_COMMANDS: &[&str] = &[
    "follow <user>",
    "unfollow <user>",
    "send friend request <user>",
    "accept friend requests",
    "join group <group id>",
];

const MENU_ITEMS: &[&str] = &[
    "Run command",
    "Edit command",
    "Pick example command",
    "Edit accounts",
    "Save accounts",
    "Clear accounts",
    "Clear log",
    "Exit",
];

/// Main interactive menu. Restores the saved session, looks for a
/// backend once so connectivity is visible up front, then loops until
/// the operator picks "Exit".
pub fn main_menu(mut runner: BatchRunner, session: SessionStore) -> Result<()> {
    let state = session.load();
    let mut accounts_text = state.accounts_text;
    let mut command = state.last_command;

    println!(
        "{}",
        "Ready. Paste accounts, type a command, and run it.".dim()
    );
    runner.discover(&mut |evt: RunEvent| print_event(&evt));

    loop {
        println!();
        println!(
            "Accounts: {}   Command: {}",
            parse_accounts(&accounts_text).len().to_string().bold(),
            if command.is_empty() {
                "(none)".dim().to_string()
            } else {
                command.as_str().bold().to_string()
            }
        );
        let selection = Select::new().items(MENU_ITEMS).default(0).interact()?;
        match selection {
            0 => {
                if command.is_empty() {
                    command = prompt_command(&command)?;
                    session.save_command(&command);
                }
                run_with_progress(&mut runner, &accounts_text, &command);
            }
            1 => {
                command = prompt_command(&command)?;
                session.save_command(&command);
            }
            2 => {
                let picked = Select::new()
                    .with_prompt("Example command")
                    .items(EXAMPLE_COMMANDS)
                    .default(0)
                    .interact_opt()?;
                if let Some(idx) = picked {
                    // Let the operator fill in placeholders before saving.
                    command = prompt_command(EXAMPLE_COMMANDS[idx])?;
                    session.save_command(&command);
                }
            }
            3 => {
                // `Editor` opens $EDITOR; `None` means the file was not saved.
                if let Some(edited) = Editor::new().extension(".txt").edit(&accounts_text)? {
                    accounts_text = edited;
                }
                println!(
                    "{} valid account(s). Use \"Save accounts\" to keep them.",
                    parse_accounts(&accounts_text).len()
                );
            }
            4 => {
                session.save_accounts(&accounts_text);
                println!("{}", "Saved locally".green());
            }
            5 => {
                let sure = Confirm::new()
                    .with_prompt("Clear all accounts?")
                    .default(false)
                    .interact()?;
                if sure {
                    accounts_text.clear();
                    session.save_accounts(&accounts_text);
                    println!("{}", "Saved locally".green());
                }
            }
            6 => {
                execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
            }
            7 => break,
            _ => {}
        }
    }
    Ok(())
}

/// One-shot mode: run once and report whether the batch dispatch
/// succeeded. The failure has already been shown by the time this returns.
pub fn run_once(runner: &mut BatchRunner, accounts_text: &str, command: &str) -> bool {
    run_with_progress(runner, accounts_text, command).is_none()
}

fn prompt_command(initial: &str) -> Result<String> {
    let command: String = Input::new()
        .with_prompt("Command")
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()?;
    Ok(command.trim().to_string())
}

/// Drive one run, rendering its events. Returns the error, if any, after
/// it has been shown to the operator.
fn run_with_progress(
    runner: &mut BatchRunner,
    accounts_text: &str,
    command: &str,
) -> Option<RunError> {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}%") {
        bar.set_style(style);
    }

    let outcome = runner.run(accounts_text, command, |evt| match &evt {
        RunEvent::Progress(pct) => bar.set_position(u64::from(*pct)),
        RunEvent::Result(result) => {
            bar.println(styled_result(result));
            bar.set_position(u64::from(result.percent));
        }
        RunEvent::Notice { .. } => bar.println(styled_notice(&evt)),
    });
    bar.finish_and_clear();

    match outcome {
        Ok(summary) => {
            println!(
                "{} {} succeeded, {} failed",
                "Completed:".green().bold(),
                summary.succeeded,
                summary.failed
            );
            None
        }
        Err(err) => {
            println!("{}", toast_for(&err).red().bold());
            Some(err)
        }
    }
}

/// Short summary shown after the detailed notices.
fn toast_for(err: &RunError) -> String {
    match err {
        RunError::Input(input) => input.to_string(),
        RunError::BackendUnreachable => "Backend unreachable".to_string(),
        RunError::Dispatch(DispatchError::ServerError { status, .. }) => {
            format!("Server error {status}")
        }
        RunError::Dispatch(_) => "Request failed".to_string(),
    }
}

fn print_event(evt: &RunEvent) {
    match evt {
        RunEvent::Notice { .. } => println!("{}", styled_notice(evt)),
        RunEvent::Result(result) => println!("{}", styled_result(result)),
        RunEvent::Progress(_) => {}
    }
}

fn styled_notice(evt: &RunEvent) -> String {
    match evt {
        RunEvent::Notice { level, text } => match level {
            NoticeLevel::Muted => text.as_str().dim().to_string(),
            NoticeLevel::Ok => text.as_str().green().to_string(),
            NoticeLevel::Error => text.as_str().red().to_string(),
        },
        _ => String::new(),
    }
}

fn styled_result(result: &ProgressEvent) -> String {
    let line = result.line();
    if result.ok {
        line.green().to_string()
    } else {
        line.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, InputError};
    use crate::locator::{BackendLocator, FallbackList};
    use crate::session::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn runner() -> BatchRunner {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let session = SessionStore::new(Arc::new(MemoryStore::default()));
        let locator = BackendLocator::new(vec![Box::new(FallbackList(vec![dead]))], session);
        BatchRunner::new(ApiClient::new(Duration::from_secs(2)).unwrap(), locator, Duration::ZERO)
    }

    #[test]
    fn run_once_reports_failure_without_an_error_value() {
        let mut runner = runner();
        assert!(!run_once(&mut runner, "A|c1", "   "));
        assert!(!run_once(&mut runner, "A|c1", "follow bob"));
    }

    #[test]
    fn toast_is_short_per_failure_kind() {
        assert_eq!(
            toast_for(&RunError::Input(InputError::EmptyCommand)),
            "Enter a command."
        );
        assert_eq!(toast_for(&RunError::BackendUnreachable), "Backend unreachable");
        assert_eq!(
            toast_for(&RunError::Dispatch(DispatchError::ServerError {
                status: 503,
                body: "down".into(),
            })),
            "Server error 503"
        );
        assert_eq!(
            toast_for(&RunError::Dispatch(DispatchError::MalformedResponse)),
            "Request failed"
        );
    }
}
