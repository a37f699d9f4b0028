//! CLI command implementations for Quizgrid.

pub(crate) mod contend;
pub(crate) mod damage;
pub(crate) mod levels;
pub(crate) mod run;

mod output;

use clap::ValueEnum;
use quizgrid::EngineError;
use quizgrid::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Output format shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Failures surfaced to the terminal.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// A flag value outside its accepted range.
    #[error("invalid argument: {0}")]
    Argument(String),
    /// The script file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    ScriptRead { path: PathBuf, source: io::Error },
    /// The script file is not a valid script.
    #[error("cannot parse {}: {source}", .path.display())]
    ScriptParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Calls answered with a status the script did not expect.
    #[error("{0} call(s) returned an unexpected status")]
    UnexpectedStatus(usize),
    /// The store failed its consistency check after a run.
    #[error("store invariants violated ({0} found)")]
    Inconsistent(usize),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("cannot encode output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
