//! Battle lifecycle operations: setup, questions, answers and grading.

use crate::battle::{Battle, BattleId, BattleQuestion, BattleStatus, Combatant, QuestionId};
use crate::error::{EngineError, EngineResult};
use crate::grid::GameId;
use crate::ledger::RosterId;
use crate::store::Tables;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const DEFAULT_QUESTION_SECS: u32 = 30;

fn default_question_secs() -> u32 {
    DEFAULT_QUESTION_SECS
}

/// A question to add, edit or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    /// Existing question to edit or delete; `None` adds a new one.
    #[serde(default)]
    pub id: Option<QuestionId>,
    /// Question text.
    #[serde(default)]
    pub prompt: String,
    /// Correct answer.
    #[serde(default)]
    pub answer: String,
    /// Maximum grade.
    #[serde(default)]
    pub possible_points: u32,
    /// Time allotment in seconds.
    #[serde(default = "default_question_secs")]
    pub time_secs: u32,
    /// Remove the question named by `id`.
    #[serde(default)]
    pub delete: bool,
}

/// Parameters for starting a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSetup {
    /// Display name.
    pub name: String,
    /// Reward description.
    #[serde(default)]
    pub reward: String,
    /// Initiating side.
    pub attacker: Combatant,
    /// Attacked side.
    pub defender: Combatant,
    /// Game to pause while the battle runs.
    #[serde(default)]
    pub game: Option<GameId>,
    /// Initial questions.
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// Hand a question to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAssignment {
    /// Question to hand out.
    pub question: QuestionId,
    /// Participant roster.
    pub roster: RosterId,
}

/// Record a grade for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionGrade {
    /// Graded question.
    pub question: QuestionId,
    /// Score awarded.
    pub score: u32,
}

fn check_combatant(tables: &Tables, combatant: Combatant) -> EngineResult<()> {
    tables.roster(combatant.roster)?;
    let unit = tables.unit(combatant.unit)?;
    if unit.owner != Some(combatant.roster) {
        return Err(EngineError::BadRequest(format!(
            "unit {} does not belong to roster {}",
            unit.id, combatant.roster
        )));
    }
    if unit.is_fallen() {
        return Err(EngineError::rejected(format!("{} has fallen", unit.name)));
    }
    Ok(())
}

fn insert_question(tables: &mut Tables, battle: BattleId, draft: &QuestionDraft) -> QuestionId {
    let id = tables.seq.questions.next_id();
    tables.questions.insert(
        id,
        BattleQuestion {
            id,
            battle,
            prompt: draft.prompt.clone(),
            answer: draft.answer.clone(),
            assigned_to: None,
            possible_points: draft.possible_points,
            received_score: 0,
            time_secs: draft.time_secs,
            submitted_answer: None,
            submitted_at: None,
        },
    );
    id
}

/// Create a battle, pausing its game if one is given.
///
/// # Errors
///
/// Returns `BadRequest` if a side fights itself or a unit is not owned by its
/// roster, `NotFound` for unknown rosters, units or games, and
/// `PreconditionFailed` if a unit has fallen or the game already has a battle.
pub fn create_battle(tables: &mut Tables, setup: BattleSetup, now: DateTime<Utc>) -> EngineResult<BattleId> {
    if setup.attacker.roster == setup.defender.roster || setup.attacker.unit == setup.defender.unit {
        return Err(EngineError::BadRequest("a roster cannot battle itself".into()));
    }
    check_combatant(tables, setup.attacker)?;
    check_combatant(tables, setup.defender)?;

    let id = tables.seq.battles.next_id();
    if let Some(game_id) = setup.game {
        let game = tables.game_mut(game_id)?;
        if let Some(existing) = game.battle_id {
            return Err(EngineError::rejected(format!(
                "game {game_id} already has battle {existing} in play"
            )));
        }
        game.battle_id = Some(id);
    }

    for draft in &setup.questions {
        insert_question(tables, id, draft);
    }
    tables.battles.insert(
        id,
        Battle {
            id,
            name: setup.name,
            reward: setup.reward,
            status: BattleStatus::Pending,
            attacker: setup.attacker,
            defender: setup.defender,
            game: setup.game,
            winner: None,
            created_at: now,
        },
    );
    info!(battle = id, game = ?setup.game, "battle created");
    Ok(id)
}

/// Rename a battle and add, edit or delete its questions.
///
/// # Errors
///
/// Returns `NotFound` for an unknown battle or a question of another battle,
/// and `PreconditionFailed` once the battle is completed.
pub fn update_battle(
    tables: &mut Tables,
    battle_id: BattleId,
    name: Option<String>,
    reward: Option<String>,
    questions: &[QuestionDraft],
) -> EngineResult<()> {
    let battle = tables.battle_mut(battle_id)?;
    battle.ensure_open()?;
    if let Some(name) = name {
        battle.name = name;
    }
    if let Some(reward) = reward {
        battle.reward = reward;
    }

    for draft in questions {
        let Some(question_id) = draft.id else {
            insert_question(tables, battle_id, draft);
            continue;
        };
        let question = tables.question_mut(question_id)?;
        if question.battle != battle_id {
            return Err(EngineError::missing("question", question_id));
        }
        if draft.delete {
            tables.questions.remove(&question_id);
            continue;
        }
        question.prompt.clone_from(&draft.prompt);
        question.answer.clone_from(&draft.answer);
        question.possible_points = draft.possible_points;
        question.time_secs = draft.time_secs;
    }
    Ok(())
}

/// Hand questions to participants.
///
/// # Errors
///
/// Returns `NotFound` for an unknown battle or a question of another battle,
/// `BadRequest` if a roster is not a participant, and `PreconditionFailed` if
/// the battle is completed, the question was already answered, or the
/// participant already has a question.
pub fn assign_questions(
    tables: &mut Tables,
    battle_id: BattleId,
    assignments: &[QuestionAssignment],
) -> EngineResult<()> {
    let battle = tables.battle(battle_id)?;
    battle.ensure_open()?;
    let battle = battle.clone();

    for assignment in assignments {
        if battle.side_of(assignment.roster).is_none() {
            return Err(EngineError::BadRequest(format!(
                "roster {} is not part of battle {battle_id}",
                assignment.roster
            )));
        }
        let question = tables.question(assignment.question)?;
        if question.battle != battle_id {
            return Err(EngineError::missing("question", assignment.question));
        }
        if question.is_answered() {
            return Err(EngineError::rejected("question has already been answered"));
        }
        let held = participant_question(tables, battle_id, assignment.roster).map(|q| q.id);
        if let Some(held) = held.filter(|&id| id != assignment.question) {
            return Err(EngineError::rejected(format!(
                "roster {} already has question {held} in this battle",
                assignment.roster
            )));
        }
        tables.question_mut(assignment.question)?.assigned_to = Some(assignment.roster);
    }
    Ok(())
}

/// Open the battle for answers.
///
/// # Errors
///
/// Returns `NotFound` for an unknown battle and `PreconditionFailed` unless it
/// is pending.
pub fn start_battle(tables: &mut Tables, battle_id: BattleId) -> EngineResult<()> {
    tables.battle_mut(battle_id)?.advance(BattleStatus::InProgress)
}

/// End the battle without damage and release its game.
///
/// # Errors
///
/// Returns `NotFound` for an unknown battle and `PreconditionFailed` if it is
/// already completed.
pub fn stop_battle(
    tables: &mut Tables,
    battle_id: BattleId,
    now: DateTime<Utc>,
) -> EngineResult<Option<GameId>> {
    tables.battle_mut(battle_id)?.advance(BattleStatus::Completed)?;
    Ok(release_game(tables, battle_id, now))
}

/// Record `roster`'s answer to its question.
///
/// The battle is not completed here; resolution is a separate step.
///
/// # Errors
///
/// Returns `NotFound` for an unknown question and `PreconditionFailed` if the
/// battle is not in progress, the question belongs to someone else, or it was
/// already answered.
pub fn submit_answer(
    tables: &mut Tables,
    roster: RosterId,
    question_id: QuestionId,
    answer: &str,
    now: DateTime<Utc>,
) -> EngineResult<BattleId> {
    let question = tables.question(question_id)?;
    let battle_id = question.battle;
    if question.assigned_to != Some(roster) {
        return Err(EngineError::rejected("question is not assigned to you"));
    }
    if question.is_answered() {
        return Err(EngineError::rejected("question has already been answered"));
    }
    if tables.battle(battle_id)?.status != BattleStatus::InProgress {
        return Err(EngineError::rejected("battle is not in progress"));
    }

    let question = tables.question_mut(question_id)?;
    question.submitted_answer = Some(answer.to_string());
    question.submitted_at = Some(now);
    Ok(battle_id)
}

/// Record grades. Grading never affects resolution.
///
/// # Errors
///
/// Returns `NotFound` for an unknown question.
pub fn grade(tables: &mut Tables, grades: &[QuestionGrade]) -> EngineResult<()> {
    for g in grades {
        tables.question_mut(g.question)?.received_score = g.score;
    }
    Ok(())
}

/// The question assigned to `roster` in `battle`.
#[must_use]
pub fn participant_question(tables: &Tables, battle: BattleId, roster: RosterId) -> Option<&BattleQuestion> {
    tables
        .questions
        .values()
        .find(|q| q.battle == battle && q.assigned_to == Some(roster))
}

/// All questions of `battle`, oldest first.
#[must_use]
pub fn questions_of(tables: &Tables, battle: BattleId) -> Vec<BattleQuestion> {
    tables
        .questions
        .values()
        .filter(|q| q.battle == battle)
        .cloned()
        .collect()
}

/// Oldest unanswered question assigned to `roster` in an open battle.
#[must_use]
pub fn unanswered_question(tables: &Tables, roster: RosterId) -> Option<BattleQuestion> {
    tables
        .questions
        .values()
        .filter(|q| q.assigned_to == Some(roster) && !q.is_answered())
        .find(|q| tables.battles.get(&q.battle).is_some_and(|b| !b.is_completed()))
        .cloned()
}

/// Unpause the game held by `battle_id`, restarting its turn window at `now`.
pub fn release_game(tables: &mut Tables, battle_id: BattleId, now: DateTime<Utc>) -> Option<GameId> {
    let game_id = tables.battles.get(&battle_id)?.game?;
    let game = tables.games.get_mut(&game_id)?;
    if game.battle_id != Some(battle_id) {
        return None;
    }
    game.battle_id = None;
    game.turn_start_time = Some(now);
    info!(game = game_id, battle = battle_id, "game released");
    Some(game_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::grid::{GameSetup, create_game};
    use crate::ledger::{UnitStatus, UnitTemplate, enroll};
    use chrono::Duration;

    fn draft(prompt: &str, answer: &str) -> QuestionDraft {
        QuestionDraft {
            id: None,
            prompt: prompt.into(),
            answer: answer.into(),
            possible_points: 10,
            time_secs: 30,
            delete: false,
        }
    }

    fn setup() -> (Tables, BattleSetup) {
        let config = ArenaConfig::default();
        let mut tables = Tables::default();
        tables.add_roster("North", Some(10), 0);
        tables.add_roster("South", Some(20), 0);
        let template = UnitTemplate {
            name: "Wolf".into(),
            ..UnitTemplate::default()
        };
        let a = enroll(&mut tables, 1, &template, UnitStatus::Warrior, &config).unwrap();
        let d = enroll(&mut tables, 2, &template, UnitStatus::Warrior, &config).unwrap();
        let game = create_game(
            &mut tables,
            GameSetup {
                name: "Castle".into(),
                thumbnail: String::new(),
                rows: 2,
                columns: 2,
                participants: vec![1, 2],
            },
            &config,
            Utc::now(),
        )
        .unwrap();
        let battle = BattleSetup {
            name: "Skirmish".into(),
            reward: "50 coins".into(),
            attacker: Combatant { unit: a, roster: 1 },
            defender: Combatant { unit: d, roster: 2 },
            game: Some(game),
            questions: vec![draft("2+2?", "4"), draft("Capital of Peru?", "Lima")],
        };
        (tables, battle)
    }

    fn ready(tables: &mut Tables, battle: BattleId) {
        assign_questions(
            tables,
            battle,
            &[
                QuestionAssignment { question: 1, roster: 1 },
                QuestionAssignment { question: 2, roster: 2 },
            ],
        )
        .unwrap();
        start_battle(tables, battle).unwrap();
    }

    #[test]
    fn test_create_pauses_game() {
        let (mut tables, setup) = setup();
        let game = setup.game.unwrap();
        let id = create_battle(&mut tables, setup.clone(), Utc::now()).unwrap();
        assert_eq!(tables.game(game).unwrap().battle_id, Some(id));
        assert_eq!(questions_of(&tables, id).len(), 2);

        let err = create_battle(&mut tables, setup, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
    }

    #[test]
    fn test_create_checks_ownership() {
        let (mut tables, mut setup) = setup();
        setup.attacker.roster = 2;
        setup.defender.roster = 1;
        assert!(matches!(
            create_battle(&mut tables, setup, Utc::now()),
            Err(EngineError::BadRequest(_))
        ));
    }

    #[test]
    fn test_one_question_per_participant() {
        let (mut tables, setup) = setup();
        let id = create_battle(&mut tables, setup, Utc::now()).unwrap();
        let err = assign_questions(
            &mut tables,
            id,
            &[
                QuestionAssignment { question: 1, roster: 1 },
                QuestionAssignment { question: 2, roster: 1 },
            ],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));

        let outsider = assign_questions(&mut tables, id, &[QuestionAssignment { question: 1, roster: 3 }]);
        assert!(matches!(outsider, Err(EngineError::BadRequest(_))));
    }

    #[test]
    fn test_submit_answer_rules() {
        let (mut tables, setup) = setup();
        let id = create_battle(&mut tables, setup, Utc::now()).unwrap();
        assign_questions(&mut tables, id, &[QuestionAssignment { question: 1, roster: 1 }]).unwrap();

        // Pending battles take no answers.
        assert!(submit_answer(&mut tables, 1, 1, "4", Utc::now()).is_err());

        start_battle(&mut tables, id).unwrap();
        assert!(submit_answer(&mut tables, 2, 1, "4", Utc::now()).is_err());
        assert_eq!(submit_answer(&mut tables, 1, 1, "4", Utc::now()).unwrap(), id);
        assert!(submit_answer(&mut tables, 1, 1, "5", Utc::now()).is_err());

        let question = tables.question(1).unwrap();
        assert_eq!(question.submitted_answer.as_deref(), Some("4"));
        assert_eq!(tables.battle(id).unwrap().status, BattleStatus::InProgress);
    }

    #[test]
    fn test_unanswered_question_oldest_first() {
        let (mut tables, setup) = setup();
        let id = create_battle(&mut tables, setup, Utc::now()).unwrap();
        ready(&mut tables, id);

        assert_eq!(unanswered_question(&tables, 2).unwrap().id, 2);
        submit_answer(&mut tables, 2, 2, "Lima", Utc::now()).unwrap();
        assert!(unanswered_question(&tables, 2).is_none());
    }

    #[test]
    fn test_stop_releases_game() {
        let (mut tables, setup) = setup();
        let game = setup.game.unwrap();
        let id = create_battle(&mut tables, setup, Utc::now()).unwrap();
        ready(&mut tables, id);

        let later = Utc::now() + Duration::seconds(90);
        assert_eq!(stop_battle(&mut tables, id, later).unwrap(), Some(game));
        let record = tables.game(game).unwrap();
        assert_eq!(record.battle_id, None);
        assert_eq!(record.turn_start_time, Some(later));
        assert!(stop_battle(&mut tables, id, later).is_err());
        assert!(unanswered_question(&tables, 1).is_none());
    }

    #[test]
    fn test_update_battle_questions() {
        let (mut tables, setup) = setup();
        let id = create_battle(&mut tables, setup, Utc::now()).unwrap();

        let edits = vec![
            QuestionDraft {
                id: Some(1),
                ..draft("3+3?", "6")
            },
            QuestionDraft {
                id: Some(2),
                delete: true,
                ..draft("", "")
            },
            draft("Largest planet?", "Jupiter"),
        ];
        update_battle(&mut tables, id, Some("Duel".into()), None, &edits).unwrap();

        let questions = questions_of(&tables, id);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].answer, "6");
        assert_eq!(questions[1].answer, "Jupiter");
        assert_eq!(tables.battle(id).unwrap().name, "Duel");

        stop_battle(&mut tables, id, Utc::now()).unwrap();
        assert!(update_battle(&mut tables, id, None, None, &[]).is_err());
    }

    #[test]
    fn test_grade_records_score() {
        let (mut tables, setup) = setup();
        create_battle(&mut tables, setup, Utc::now()).unwrap();
        grade(&mut tables, &[QuestionGrade { question: 2, score: 8 }]).unwrap();
        assert_eq!(tables.question(2).unwrap().received_score, 8);
        assert!(grade(&mut tables, &[QuestionGrade { question: 9, score: 1 }]).is_err());
    }
}
