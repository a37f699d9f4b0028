//! Output formatting utilities for CLI.

use quizgrid::Stats;
use quizgrid::battle::{Impact, Verdict};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

/// One dispatched script call.
#[derive(Debug, Serialize)]
pub(super) struct StepReport {
    /// Position in the script (1-based).
    pub(super) step: usize,
    /// Operation name.
    pub(super) op: &'static str,
    /// Status code returned.
    pub(super) status: u16,
    /// Response body.
    pub(super) body: Value,
    /// Expected status, when the script names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) expected: Option<u16>,
}

impl StepReport {
    /// Whether the status differs from the expected one.
    pub(super) fn is_unexpected(&self) -> bool {
        self.expected.is_some_and(|e| e != self.status)
    }
}

/// A frame pushed to a connected viewer.
#[derive(Debug, Serialize)]
pub(super) struct PushRecord {
    /// Step after which the frame was observed.
    pub(super) step: usize,
    /// Receiving viewer.
    pub(super) viewer: u64,
    /// Decoded frame.
    pub(super) frame: Value,
}

/// Everything a script run produced.
#[derive(Debug, Serialize)]
pub(super) struct ScriptReport {
    /// Dispatched calls.
    pub(super) steps: Vec<StepReport>,
    /// Push frames, in delivery order per viewer.
    pub(super) pushes: Vec<PushRecord>,
    /// Rendered board, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) board: Option<String>,
    /// Invariant violations, if checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) violations: Option<Vec<String>>,
}

impl ScriptReport {
    /// Number of calls whose status missed its expectation.
    pub(super) fn unexpected_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_unexpected()).count()
    }
}

/// Format a script report as human-readable text.
pub(super) fn format_script_text(report: &ScriptReport) -> String {
    let mut output = String::new();

    for step in &report.steps {
        let _ = write!(output, "#{:<3} {:<20} {}", step.step, step.op, step.status);
        if step.is_unexpected() {
            let _ = write!(output, " (expected {})", step.expected.unwrap_or_default());
        }
        let _ = writeln!(output, "  {}", step.body);
    }

    if !report.pushes.is_empty() {
        output.push_str("\nPushes:\n");
        for push in &report.pushes {
            let _ = writeln!(output, "  after #{:<3} viewer {:<4} {}", push.step, push.viewer, push.frame);
        }
    }

    if let Some(board) = &report.board {
        output.push('\n');
        output.push_str(board);
    }

    if let Some(violations) = &report.violations {
        if violations.is_empty() {
            output.push_str("\nInvariants: OK\n");
        } else {
            output.push_str("\nInvariant violations:\n");
            for v in violations {
                let _ = writeln!(output, "  {v}");
            }
        }
    }

    output
}

/// Result of a contention run.
#[derive(Debug, Serialize)]
pub(super) struct ContendReport {
    /// Turn windows run.
    pub(super) rounds: u32,
    /// Concurrent callers per round.
    pub(super) callers: usize,
    /// Requests that moved the turn.
    pub(super) advances: u64,
    /// Requests that were no-ops.
    pub(super) holds: u64,
    /// Requests that failed.
    pub(super) errors: u64,
    /// Turn index at the end.
    pub(super) final_turn_index: usize,
    /// Wall time in milliseconds.
    pub(super) duration_ms: u128,
}

/// Format a contention report as human-readable text.
pub(super) fn format_contend_text(report: &ContendReport) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Contention: {} rounds x {} callers",
        report.rounds, report.callers
    );
    let _ = writeln!(output, "  Advances: {} (one per round expected)", report.advances);
    let _ = writeln!(output, "  No-ops:   {}", report.holds);
    let _ = writeln!(output, "  Errors:   {}", report.errors);
    let _ = writeln!(output, "  Final turn index: {}", report.final_turn_index);
    let _ = writeln!(output, "  Duration: {} ms", report.duration_ms);
    output
}

/// One row of the progression table.
#[derive(Debug, Serialize)]
pub(super) struct LevelRow {
    /// Level.
    pub(super) level: u32,
    /// Stats at this level.
    pub(super) stats: Stats,
    /// Price at this level.
    pub(super) cost: u32,
}

/// Format a progression table as human-readable text.
pub(super) fn format_levels_text(rows: &[LevelRow]) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:>5} {:>7} {:>7} {:>7} {:>7}",
        "Level", "Attack", "Defense", "Healing", "Cost"
    );
    for row in rows {
        let _ = writeln!(
            output,
            "{:>5} {:>7} {:>7} {:>7} {:>7}",
            row.level, row.stats.attack, row.stats.defense, row.stats.healing, row.cost
        );
    }
    output
}

/// One row of the outcome table.
#[derive(Debug, Serialize)]
pub(super) struct OutcomeRow {
    /// Answer classification.
    pub(super) verdict: Verdict,
    /// Losses.
    pub(super) impact: Impact,
    /// Defender's remaining health.
    pub(super) defender_health: u32,
    /// Attacker's remaining stamina.
    pub(super) attacker_stamina: u32,
    /// Whether the defender is knocked out.
    pub(super) knocked_out: bool,
}

/// The full outcome table.
#[derive(Debug, Serialize)]
pub(super) struct DamageTable {
    /// Raw damage.
    pub(super) damage: f64,
    /// Outcome per verdict.
    pub(super) outcomes: Vec<OutcomeRow>,
}

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::BothCorrect => "both correct",
        Verdict::AttackerOnly => "attacker only",
        Verdict::DefenderOnly => "defender only",
        Verdict::NeitherCorrect => "neither correct",
    }
}

/// Format an outcome table as human-readable text.
pub(super) fn format_damage_text(table: &DamageTable) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Damage: {:.2}\n", table.damage);
    let _ = writeln!(
        output,
        "{:<16} {:>8} {:>8} {:>8} {:>8}",
        "Verdict", "-Health", "-Stamina", "Health", "Stamina"
    );
    for row in &table.outcomes {
        let _ = write!(
            output,
            "{:<16} {:>8} {:>8} {:>8} {:>8}",
            verdict_label(row.verdict),
            row.impact.defender_health,
            row.impact.attacker_stamina,
            row.defender_health,
            row.attacker_stamina
        );
        if row.knocked_out {
            output.push_str("  RIP");
        }
        output.push('\n');
    }
    output
}
