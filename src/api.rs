//! Request dispatch.
//!
//! Each client call is a tagged JSON object, `{"op": "purchase", ...}`. The
//! dispatcher resolves the caller, runs the matching [`Arena`] operation and
//! turns the result into a status code plus a JSON body. Errors become
//! `{"error": "..."}` with the status from [`EngineError::status_code`].

use crate::arena::{Arena, Caller};
use crate::battle::{BattleId, BattleSetup, QuestionAssignment, QuestionDraft, QuestionGrade, QuestionId};
use crate::error::{EngineError, EngineResult};
use crate::grid::{CellId, CellUpdate, GameId, GameSetup};
use crate::ledger::{LegacyUnitRecord, RosterId, UnitId, UnitStatus, UnitTemplate, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// A client call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Create a roster.
    AddRoster {
        /// Display name.
        name: String,
        /// Controlling user.
        #[serde(default)]
        owner: Option<UserId>,
        /// Starting coins.
        #[serde(default)]
        coins: u32,
    },
    /// Put units on sale.
    Restock {
        /// Blueprint for the new units.
        template: UnitTemplate,
        /// Number of units.
        count: u32,
        /// Roster holding first purchase right.
        #[serde(default)]
        locked_by: Option<RosterId>,
    },
    /// Create a unit directly in a roster.
    Enroll {
        /// Receiving roster.
        roster: RosterId,
        /// Blueprint.
        template: UnitTemplate,
        /// Warrior or mascot.
        status: UnitStatus,
    },
    /// Import a unit record that may lack base stats.
    ImportLegacy(LegacyUnitRecord),
    /// Fetch a unit.
    GetAsset {
        /// Unit to fetch.
        asset: UnitId,
    },
    /// Fetch a roster.
    GetRoster {
        /// Roster to fetch.
        roster: RosterId,
    },
    /// Units owned by a roster.
    RosterUnits {
        /// Owning roster.
        roster: RosterId,
    },
    /// Store pool grouped by asset name.
    StoreListing,
    /// Ask a lock holder for access.
    RequestAccess {
        /// Locked unit.
        asset: UnitId,
    },
    /// Release a locked unit to a requester.
    ApproveAccess {
        /// Locked unit.
        asset: UnitId,
        /// Requesting roster.
        requester: RosterId,
    },
    /// Refuse a request.
    DenyAccess {
        /// Locked unit.
        asset: UnitId,
        /// Requesting roster.
        requester: RosterId,
    },
    /// Latest access request.
    GetAccessRequest {
        /// Locked unit.
        asset: UnitId,
        /// Requesting roster.
        requester: RosterId,
    },
    /// Buy a unit by name.
    Purchase {
        /// Asset name.
        asset_name: String,
    },
    /// Grant experience.
    GrantExperience {
        /// Receiving unit.
        unit: UnitId,
        /// Experience points.
        xp: u32,
    },
    /// Create a game.
    CreateGame(GameSetup),
    /// Fetch a game with its board.
    GetGame {
        /// Game to fetch.
        game: GameId,
    },
    /// Every game.
    ListGames,
    /// Rename a game or change its thumbnail.
    UpdateGame {
        /// Game to edit.
        game: GameId,
        /// New name.
        #[serde(default)]
        name: Option<String>,
        /// New thumbnail.
        #[serde(default)]
        thumbnail: Option<String>,
    },
    /// Delete a game.
    DeleteGame {
        /// Game to delete.
        game: GameId,
    },
    /// Replace a cell's editable fields.
    UpdateCell {
        /// Cell to edit.
        cell: CellId,
        /// New contents.
        update: CellUpdate,
    },
    /// Place a warrior.
    PlaceUnit {
        /// Target cell.
        cell: CellId,
        /// Warrior to place.
        unit: UnitId,
    },
    /// Move a unit between cells.
    MoveUnit {
        /// Source cell.
        from: CellId,
        /// Destination cell.
        to: CellId,
        /// Unit to move.
        unit: UnitId,
    },
    /// Advance the turn if its window ran out.
    AdvanceTurn {
        /// Game to advance.
        game: GameId,
    },
    /// Give the turn to a roster.
    SetTurn {
        /// Game to edit.
        game: GameId,
        /// Roster to receive the turn.
        roster: RosterId,
    },
    /// Start a battle.
    CreateBattle(BattleSetup),
    /// Fetch a battle.
    GetBattle {
        /// Battle to fetch.
        battle: BattleId,
    },
    /// Every battle.
    ListBattles,
    /// Edit a battle and its questions.
    UpdateBattle {
        /// Battle to edit.
        battle: BattleId,
        /// New name.
        #[serde(default)]
        name: Option<String>,
        /// New reward text.
        #[serde(default)]
        reward: Option<String>,
        /// Question edits.
        #[serde(default)]
        questions: Vec<QuestionDraft>,
    },
    /// Hand questions to participants.
    AssignQuestions {
        /// Battle concerned.
        battle: BattleId,
        /// Assignments.
        assignments: Vec<QuestionAssignment>,
    },
    /// Open a battle for answers.
    StartBattle {
        /// Battle to open.
        battle: BattleId,
    },
    /// End a battle without damage.
    StopBattle {
        /// Battle to stop.
        battle: BattleId,
    },
    /// Answer a question.
    SubmitAnswer {
        /// Question answered.
        question: QuestionId,
        /// Answer text.
        answer: String,
    },
    /// Record grades.
    Grade {
        /// Grades to record.
        grades: Vec<QuestionGrade>,
    },
    /// Oldest open question for a roster.
    UnansweredQuestion {
        /// Roster asking.
        roster: RosterId,
    },
    /// Resolve a battle.
    CompleteBattle {
        /// Battle to resolve.
        battle: BattleId,
    },
}

impl Request {
    /// Operation name, as written in the `op` tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddRoster { .. } => "add_roster",
            Self::Restock { .. } => "restock",
            Self::Enroll { .. } => "enroll",
            Self::ImportLegacy(_) => "import_legacy",
            Self::GetAsset { .. } => "get_asset",
            Self::GetRoster { .. } => "get_roster",
            Self::RosterUnits { .. } => "roster_units",
            Self::StoreListing => "store_listing",
            Self::RequestAccess { .. } => "request_access",
            Self::ApproveAccess { .. } => "approve_access",
            Self::DenyAccess { .. } => "deny_access",
            Self::GetAccessRequest { .. } => "get_access_request",
            Self::Purchase { .. } => "purchase",
            Self::GrantExperience { .. } => "grant_experience",
            Self::CreateGame(_) => "create_game",
            Self::GetGame { .. } => "get_game",
            Self::ListGames => "list_games",
            Self::UpdateGame { .. } => "update_game",
            Self::DeleteGame { .. } => "delete_game",
            Self::UpdateCell { .. } => "update_cell",
            Self::PlaceUnit { .. } => "place_unit",
            Self::MoveUnit { .. } => "move_unit",
            Self::AdvanceTurn { .. } => "advance_turn",
            Self::SetTurn { .. } => "set_turn",
            Self::CreateBattle(_) => "create_battle",
            Self::GetBattle { .. } => "get_battle",
            Self::ListBattles => "list_battles",
            Self::UpdateBattle { .. } => "update_battle",
            Self::AssignQuestions { .. } => "assign_questions",
            Self::StartBattle { .. } => "start_battle",
            Self::StopBattle { .. } => "stop_battle",
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::Grade { .. } => "grade",
            Self::UnansweredQuestion { .. } => "unanswered_question",
            Self::CompleteBattle { .. } => "complete_battle",
        }
    }

    /// Whether the request may be served without a caller identity.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(
            self,
            Self::AdvanceTurn { .. }
                | Self::GetGame { .. }
                | Self::ListGames
                | Self::GetBattle { .. }
                | Self::ListBattles
                | Self::StoreListing
                | Self::GetAsset { .. }
        )
    }
}

/// Status code and JSON body of a dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// Result payload or `{"error": ...}`.
    pub body: Value,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn from_error(error: &EngineError) -> Self {
        Self {
            status: error.status_code(),
            body: json!({ "error": error.to_string() }),
        }
    }

    /// Whether the request succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 200
    }
}

fn to_body<T: Serialize>(value: &T) -> EngineResult<Value> {
    serde_json::to_value(value).map_err(|e| EngineError::Internal(format!("encoding response: {e}")))
}

/// Run one request against the arena.
#[must_use]
pub fn dispatch(arena: &Arena, caller: Option<&Caller>, request: Request) -> Response {
    let op = request.name();
    let public = request.is_public();
    match handle(arena, caller, request) {
        Ok(body) => {
            debug!(op, public, "request served");
            Response::ok(body)
        }
        Err(e) => {
            if matches!(e, EngineError::Internal(_)) {
                warn!(op, error = %e, "request failed");
            } else {
                debug!(op, error = %e, "request refused");
            }
            Response::from_error(&e)
        }
    }
}

fn handle(arena: &Arena, caller: Option<&Caller>, request: Request) -> EngineResult<Value> {
    let signed_in = || caller.ok_or(EngineError::Unauthorized);

    match request {
        Request::AdvanceTurn { game } => to_body(&arena.advance_turn(game)?),
        Request::GetGame { game } => to_body(&arena.game(game)?),
        Request::ListGames => to_body(&arena.games()?),
        Request::GetBattle { battle } => to_body(&arena.battle(battle)?),
        Request::ListBattles => to_body(&arena.battles()?),
        Request::StoreListing => to_body(&arena.store_listing()?),
        Request::GetAsset { asset } => to_body(&arena.asset(asset)?),

        Request::AddRoster { name, owner, coins } => {
            let id = arena.add_roster(signed_in()?, &name, owner, coins)?;
            Ok(json!({ "id": id }))
        }
        Request::Restock {
            template,
            count,
            locked_by,
        } => {
            let ids = arena.restock(signed_in()?, &template, count, locked_by)?;
            Ok(json!({ "ids": ids }))
        }
        Request::Enroll {
            roster,
            template,
            status,
        } => {
            let id = arena.enroll(signed_in()?, roster, &template, status)?;
            Ok(json!({ "id": id }))
        }
        Request::ImportLegacy(record) => {
            let id = arena.import_legacy(signed_in()?, record)?;
            Ok(json!({ "id": id }))
        }
        Request::GetRoster { roster } => {
            signed_in()?;
            to_body(&arena.roster(roster)?)
        }
        Request::RosterUnits { roster } => {
            signed_in()?;
            to_body(&arena.roster_units(roster)?)
        }
        Request::RequestAccess { asset } => to_body(&arena.request_access(signed_in()?, asset)?),
        Request::ApproveAccess { asset, requester } => {
            to_body(&arena.approve_access(signed_in()?, asset, requester)?)
        }
        Request::DenyAccess { asset, requester } => {
            to_body(&arena.deny_access(signed_in()?, asset, requester)?)
        }
        Request::GetAccessRequest { asset, requester } => {
            to_body(&arena.access_request(signed_in()?, asset, requester)?)
        }
        Request::Purchase { asset_name } => to_body(&arena.purchase(signed_in()?, &asset_name)?),
        Request::GrantExperience { unit, xp } => {
            to_body(&arena.grant_experience(signed_in()?, unit, xp)?)
        }
        Request::CreateGame(setup) => {
            let id = arena.create_game(signed_in()?, setup)?;
            Ok(json!({ "id": id }))
        }
        Request::UpdateGame {
            game,
            name,
            thumbnail,
        } => {
            arena.update_game(signed_in()?, game, name, thumbnail)?;
            Ok(json!({ "success": true }))
        }
        Request::DeleteGame { game } => {
            arena.delete_game(signed_in()?, game)?;
            Ok(json!({ "success": true }))
        }
        Request::UpdateCell { cell, update } => {
            arena.update_cell(signed_in()?, cell, update)?;
            Ok(json!({ "success": true }))
        }
        Request::PlaceUnit { cell, unit } => {
            arena.place_unit(signed_in()?, cell, unit)?;
            Ok(json!({ "success": true }))
        }
        Request::MoveUnit { from, to, unit } => {
            arena.move_unit(signed_in()?, from, to, unit)?;
            Ok(json!({ "success": true }))
        }
        Request::SetTurn { game, roster } => to_body(&arena.set_turn(signed_in()?, game, roster)?),
        Request::CreateBattle(setup) => {
            let id = arena.create_battle(signed_in()?, setup)?;
            Ok(json!({ "id": id }))
        }
        Request::UpdateBattle {
            battle,
            name,
            reward,
            questions,
        } => {
            arena.update_battle(signed_in()?, battle, name, reward, &questions)?;
            Ok(json!({ "success": true }))
        }
        Request::AssignQuestions { battle, assignments } => {
            arena.assign_questions(signed_in()?, battle, &assignments)?;
            Ok(json!({ "success": true }))
        }
        Request::StartBattle { battle } => {
            arena.start_battle(signed_in()?, battle)?;
            Ok(json!({ "success": true }))
        }
        Request::StopBattle { battle } => {
            arena.stop_battle(signed_in()?, battle)?;
            Ok(json!({ "success": true }))
        }
        Request::SubmitAnswer { question, answer } => {
            let battle = arena.submit_answer(signed_in()?, question, &answer)?;
            Ok(json!({ "success": true, "battle": battle }))
        }
        Request::Grade { grades } => {
            arena.grade(signed_in()?, &grades)?;
            Ok(json!({ "success": true }))
        }
        Request::UnansweredQuestion { roster } => {
            to_body(&arena.unanswered_question(signed_in()?, roster)?)
        }
        Request::CompleteBattle { battle } => to_body(&arena.complete_battle(signed_in()?, battle)?),
    }
}
