//! Process entry: argument parsing, telemetry and the shell session
//!
//! - `commands` - clap definitions
//! - `dispatch` - `ArgMatches` into a typed `Action`
//! - `actions` - what each action runs
//! - `telemetry` - tracing subscriber setup

pub mod actions;
pub mod commands;
pub mod dispatch;
mod start;
pub mod telemetry;

pub use start::start;
