//! CLI module for chartflow
//!
//! Provides command-line interface for:
//! - query: run a workflow over a dataset file
//! - explain: rank explanations for a selection

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, load_config, query, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json, read_rows, write_error, write_response};
