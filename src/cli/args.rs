//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Library Fixer - Reorganize movie and TV libraries for media servers
#[derive(Parser, Debug)]
#[command(name = "library-fixer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Never query the metadata service
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show what the scanner and detector find in a folder
    Scan {
        /// Library folder
        #[arg(value_name = "DIR")]
        path: PathBuf,
    },

    /// Generate a plan without touching any file
    Plan {
        /// Library folder
        #[arg(value_name = "DIR")]
        path: PathBuf,

        /// Output path for plan.json
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Execute a saved plan file
    Execute {
        /// Path to the plan.json file
        #[arg(value_name = "PLAN_FILE")]
        plan_file: PathBuf,

        /// Apply the operations (default is a dry run)
        #[arg(long)]
        apply: bool,
    },

    /// Plan and execute one folder
    Run {
        /// Library folder
        #[arg(value_name = "DIR")]
        path: PathBuf,

        /// Apply the operations (default is a dry run)
        #[arg(long)]
        apply: bool,

        /// Save the execution report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Plan and execute many folders in parallel
    Batch {
        /// Library folders
        #[arg(value_name = "DIR", required = true)]
        paths: Vec<PathBuf>,

        /// Folders processed at once (defaults to the configured concurrency)
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,

        /// Apply the operations (default is a dry run)
        #[arg(long)]
        apply: bool,

        /// Directory for per-folder log files
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Save the batch report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch() {
        let cli = Cli::parse_from([
            "library-fixer",
            "--offline",
            "batch",
            "/a",
            "/b",
            "--jobs",
            "3",
            "--apply",
        ]);
        assert!(cli.offline);
        match cli.command {
            Commands::Batch {
                paths, jobs, apply, ..
            } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(jobs, Some(3));
                assert!(apply);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
