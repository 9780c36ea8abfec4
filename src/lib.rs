// Library root
// -----------
// This crate exposes the pieces of the batch-command CLI as a library so
// they can be tested without a terminal. The binary (`main.rs`) wires
// them together.
//
// Module responsibilities:
// - `accounts`: parses the raw accounts text into label/cookie records.
// - `api`: HTTP interactions with the backend (health check, batch run)
//   and the request/result types that go over the wire.
// - `locator`: finds a healthy backend among ordered candidate sources and
//   keeps it until a failed dispatch invalidates it.
// - `progress`: turns the result list into ordered progress events.
// - `session`: persists accounts text, last command and backend address.
// - `runner`: one operator run from input validation to the last result.
// - `config`: command-line flags and environment variables.
// - `ui`: the interactive terminal menu and the one-shot mode.
pub mod accounts;
pub mod api;
pub mod config;
pub mod locator;
pub mod progress;
pub mod runner;
pub mod session;
pub mod ui;
