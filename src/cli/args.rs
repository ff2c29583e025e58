//! CLI argument definitions using clap
//!
//! Commands:
//! - chartflow query --data <rows.json> --workflow <steps.json> [--offset N] [--limit N]
//! - chartflow explain --data <rows.json> --request <request.json>
//!
//! Both accept `--config <path>`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chartflow - chart query workflows and selection explanations
#[derive(Parser, Debug)]
#[command(name = "chartflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a workflow over a dataset and print the rows
    Query {
        /// JSON array of row objects
        #[arg(long)]
        data: PathBuf,

        /// JSON array of workflow steps
        #[arg(long)]
        workflow: PathBuf,

        /// Rows to skip in the final result
        #[arg(long)]
        offset: Option<usize>,

        /// Maximum rows to return (0 = no limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Explain a selection and print ranked candidates
    Explain {
        /// JSON array of row objects
        #[arg(long)]
        data: PathBuf,

        /// Explain request JSON
        #[arg(long)]
        request: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    /// Subcommand name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Query { .. } => "query",
            Command::Explain { .. } => "explain",
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
