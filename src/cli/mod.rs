//! Command shell over the finance tracker.

pub mod commands;
pub mod context;
pub mod forms;
pub mod help;
pub mod output;
pub mod registry;
pub mod shell;
pub mod ui;

pub use context::{CliError, CliMode, CommandError, ShellContext};
pub use shell::{run_cli, run_command};
