//! Run command implementation.
//!
//! A script is a JSON document:
//!
//! ```json
//! {
//!   "start": "2024-05-01T10:00:00Z",
//!   "steps": [
//!     {"call": {"caller": {"user": 1, "privileged": true},
//!               "request": {"op": "add_roster", "name": "North", "owner": 10}}},
//!     {"connect": {"viewer": 10}},
//!     {"wait": {"seconds": 18}},
//!     {"call": {"request": {"op": "advance_turn", "game": 1}, "expect": 200}}
//!   ]
//! }
//! ```
//!
//! The arena runs on a manual clock that only moves on `wait` steps.

use super::output::{PushRecord, ScriptReport, StepReport, format_script_text};
use super::{CliError, OutputFormat, print_json};
use chrono::{DateTime, TimeZone, Utc};
use quizgrid::broadcast::ChannelSink;
use quizgrid::clock::ManualClock;
use quizgrid::notify::NotificationLog;
use quizgrid::{Arena, ArenaConfig, Caller, Request, UserId, check_invariants, dispatch};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tracing::info;

/// A scenario script.
#[derive(Debug, Deserialize)]
struct Script {
    /// Initial clock reading.
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    /// Steps, run in order.
    steps: Vec<Step>,
}

/// One script step.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Step {
    /// Dispatch a request.
    Call {
        /// Caller identity; anonymous when absent.
        #[serde(default)]
        caller: Option<Caller>,
        /// Request to dispatch.
        request: Request,
        /// Expected status code.
        #[serde(default)]
        expect: Option<u16>,
    },
    /// Move the clock forward.
    Wait {
        /// Seconds to advance.
        seconds: i64,
    },
    /// Open a push channel for a viewer.
    Connect {
        /// Viewer to connect.
        viewer: UserId,
    },
    /// Close a viewer's push channel.
    Disconnect {
        /// Viewer to disconnect.
        viewer: UserId,
    },
}

fn default_start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or_default()
}

/// Load a script from disk.
fn load_script(path: &Path) -> Result<Script, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::ScriptRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ScriptParse {
        path: path.to_path_buf(),
        source,
    })
}

fn drain(
    viewers: &BTreeMap<UserId, Receiver<String>>,
    step: usize,
    pushes: &mut Vec<PushRecord>,
) {
    for (&viewer, receiver) in viewers {
        for frame in receiver.try_iter() {
            let frame = serde_json::from_str(&frame).unwrap_or(serde_json::Value::String(frame));
            pushes.push(PushRecord {
                step,
                viewer,
                frame,
            });
        }
    }
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the script cannot be loaded, a call misses its
/// expected status, or invariants are violated.
pub(crate) fn execute(
    script_path: &Path,
    config: ArenaConfig,
    format: OutputFormat,
    board: Option<u64>,
    check: bool,
) -> Result<(), CliError> {
    let script = load_script(script_path)?;
    let clock = Arc::new(ManualClock::new(script.start.unwrap_or_else(default_start)));
    let arena = Arena::new(config, clock.clone(), Arc::new(NotificationLog::new()));

    let mut viewers: BTreeMap<UserId, Receiver<String>> = BTreeMap::new();
    let mut steps = Vec::new();
    let mut pushes = Vec::new();

    for (index, step) in script.steps.into_iter().enumerate() {
        let number = index + 1;
        match step {
            Step::Call {
                caller,
                request,
                expect,
            } => {
                let op = request.name();
                let response = dispatch(&arena, caller.as_ref(), request);
                steps.push(StepReport {
                    step: number,
                    op,
                    status: response.status,
                    body: response.body,
                    expected: expect,
                });
            }
            Step::Wait { seconds } => clock.advance_secs(seconds),
            Step::Connect { viewer } => {
                let (sink, receiver) = ChannelSink::pair();
                arena.connect(viewer, Box::new(sink));
                viewers.insert(viewer, receiver);
            }
            Step::Disconnect { viewer } => {
                arena.disconnect(viewer);
                viewers.remove(&viewer);
            }
        }
        drain(&viewers, number, &mut pushes);
    }
    info!(steps = steps.len(), pushes = pushes.len(), "script finished");

    let board = board
        .map(|game| arena.render(game, matches!(format, OutputFormat::Text)))
        .transpose()?;
    let violations = if check {
        let tables = arena.store().snapshot()?;
        Some(
            check_invariants(&tables, arena.config())
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        )
    } else {
        None
    };

    let report = ScriptReport {
        steps,
        pushes,
        board,
        violations,
    };

    match format {
        OutputFormat::Text => print!("{}", format_script_text(&report)),
        OutputFormat::Json => print_json(&report)?,
    }

    let unexpected = report.unexpected_count();
    if unexpected > 0 {
        return Err(CliError::UnexpectedStatus(unexpected));
    }
    if let Some(found) = report.violations.as_ref().map(Vec::len).filter(|&n| n > 0) {
        return Err(CliError::Inconsistent(found));
    }
    Ok(())
}
