//! Question battles between two units.
//!
//! A battle moves `pending → in_progress → completed` and never back. Each
//! participant gets one question; once both have answered (or an
//! administrator decides to), the battle is resolved with the damage table in
//! [`resolve_battle`].

mod flow;
mod resolve;
mod state;

pub use flow::{
    BattleSetup, QuestionAssignment, QuestionDraft, QuestionGrade, assign_questions, create_battle,
    grade, participant_question, questions_of, release_game, start_battle, stop_battle,
    submit_answer, unanswered_question, update_battle,
};
pub use resolve::{Impact, Resolution, Verdict, damage_points, impact, resolve_battle};
pub use state::{Battle, BattleId, BattleQuestion, BattleStatus, Combatant, QuestionId, Side};
