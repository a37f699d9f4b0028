//! Damage command implementation.

use super::output::{DamageTable, OutcomeRow, format_damage_text};
use super::{CliError, OutputFormat, print_json};
use quizgrid::ArenaConfig;
use quizgrid::battle::{Verdict, damage_points, impact};

/// Execute the damage command.
///
/// # Errors
///
/// Returns an error if output fails.
pub(crate) fn execute(
    config: &ArenaConfig,
    attack: u32,
    defense: u32,
    health: u32,
    stamina: u32,
    format: OutputFormat,
) -> Result<(), CliError> {
    let damage = damage_points(attack, defense);
    let outcomes = [
        Verdict::BothCorrect,
        Verdict::AttackerOnly,
        Verdict::DefenderOnly,
        Verdict::NeitherCorrect,
    ]
    .into_iter()
    .map(|verdict| {
        let losses = impact(verdict, damage, config.miss_penalty);
        let defender_health = health.saturating_sub(losses.defender_health);
        OutcomeRow {
            verdict,
            impact: losses,
            defender_health,
            attacker_stamina: stamina.saturating_sub(losses.attacker_stamina),
            knocked_out: defender_health == 0,
        }
    })
    .collect();
    let table = DamageTable { damage, outcomes };

    match format {
        OutputFormat::Text => print!("{}", format_damage_text(&table)),
        OutputFormat::Json => print_json(&table)?,
    }
    Ok(())
}
