//! The arena: every client-facing operation.
//!
//! Each mutating request runs in one store transaction. Board changes are
//! announced to connected viewers only after the transaction commits, so a
//! rejected request never produces a push.

use crate::battle::{
    self, Battle, BattleId, BattleQuestion, BattleSetup, QuestionAssignment, QuestionDraft,
    QuestionGrade, QuestionId, Resolution,
};
use crate::broadcast::{Broadcaster, PushChannel, PushMessage};
use crate::clock::{Clock, SystemClock};
use crate::config::ArenaConfig;
use crate::error::{EngineError, EngineResult};
use crate::grid::{self, Cell, CellId, CellUpdate, Game, GameId, GameSetup};
use crate::ledger::{
    self, AccessDecision, AccessRequest, ExperienceReport, LegacyUnitRecord, Roster, RosterId,
    StoreListing, Unit, UnitId, UnitStatus, UnitTemplate, UserId,
};
use crate::notify::{NotificationLog, Notifier};
use crate::store::{Store, Tables};
use crate::turn::{self, TurnOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const ACCESS_REQUEST_TITLE: &str = "Asset Access Request";
const ACCESS_APPROVED_TITLE: &str = "Asset Access Approved";
const ACCESS_DENIED_TITLE: &str = "Asset Access Denied";

/// Identity of whoever issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Authenticated user.
    pub user: UserId,
    /// Roster the user plays as, if any.
    #[serde(default)]
    pub roster: Option<RosterId>,
    /// Administrator rights.
    #[serde(default)]
    pub privileged: bool,
}

impl Caller {
    /// A player acting as `roster`.
    #[must_use]
    pub const fn player(user: UserId, roster: RosterId) -> Self {
        Self {
            user,
            roster: Some(roster),
            privileged: false,
        }
    }

    /// An administrator without a roster.
    #[must_use]
    pub const fn admin(user: UserId) -> Self {
        Self {
            user,
            roster: None,
            privileged: true,
        }
    }

    /// The roster this caller plays as.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the caller has no roster.
    pub fn roster(&self) -> EngineResult<RosterId> {
        self.roster
            .ok_or_else(|| EngineError::Forbidden("caller does not play a roster".into()))
    }

    /// Fail unless the caller is an administrator.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers.
    pub fn require_privileged(&self) -> EngineResult<()> {
        if self.privileged {
            Ok(())
        } else {
            Err(EngineError::Forbidden("administrator rights required".into()))
        }
    }

    fn acts_for(&self, roster: RosterId) -> bool {
        self.privileged || self.roster == Some(roster)
    }
}

/// A battle with its units and questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleView {
    /// The battle record.
    pub battle: Battle,
    /// Attacking unit.
    pub attacker_unit: Option<Unit>,
    /// Defending unit.
    pub defender_unit: Option<Unit>,
    /// Question assigned to the attacker.
    pub attacker_question: Option<BattleQuestion>,
    /// Question assigned to the defender.
    pub defender_question: Option<BattleQuestion>,
    /// Every question of the battle.
    pub questions: Vec<BattleQuestion>,
}

/// A game with its board and running battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameView {
    /// The game record.
    pub game: Game,
    /// Cells, row by row.
    pub cells: Vec<Cell>,
    /// Battle pausing the game.
    pub battle: Option<BattleView>,
}

/// Outcome of a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseReceipt {
    /// Whether the unit changed hands.
    pub success: bool,
    /// Human-readable result.
    pub message: String,
    /// Buyer's balance after the attempt.
    pub coins: u32,
    /// Unit bought.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitId>,
}

fn battle_view(tables: &Tables, battle_id: BattleId) -> EngineResult<BattleView> {
    let battle = tables.battle(battle_id)?.clone();
    let question_for =
        |roster| battle::participant_question(tables, battle_id, roster).cloned();
    Ok(BattleView {
        attacker_unit: tables.units.get(&battle.attacker.unit).cloned(),
        defender_unit: tables.units.get(&battle.defender.unit).cloned(),
        attacker_question: question_for(battle.attacker.roster),
        defender_question: question_for(battle.defender.roster),
        questions: battle::questions_of(tables, battle_id),
        battle,
    })
}

/// Shared engine state behind every request.
#[derive(Debug)]
pub struct Arena {
    config: ArenaConfig,
    store: Store,
    broadcaster: Broadcaster,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl Arena {
    /// Create an arena with the given collaborators.
    #[must_use]
    pub fn new(config: ArenaConfig, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            store: Store::default(),
            broadcaster: Broadcaster::new(),
            notifier,
            clock,
        }
    }

    /// Create an arena on the wall clock with an in-memory notification log.
    #[must_use]
    pub fn with_defaults(config: ArenaConfig) -> Self {
        Self::new(config, Arc::new(SystemClock), Arc::new(NotificationLog::new()))
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// The viewer registry.
    #[must_use]
    pub const fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Current time per the arena clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn announce(&self, game: GameId) {
        self.broadcaster.broadcast_board(game);
    }

    fn push_notice(&self, user: UserId, title: &str, message: String) {
        self.broadcaster.notify(
            user,
            &PushMessage::NewNotification {
                title: title.to_string(),
                message,
            },
        );
    }

    // ----- viewers -----

    /// Register a push channel for `viewer`.
    pub fn connect(&self, viewer: UserId, channel: Box<dyn PushChannel>) {
        self.broadcaster.connect(viewer, channel);
    }

    /// Drop `viewer`'s push channel.
    pub fn disconnect(&self, viewer: UserId) -> bool {
        self.broadcaster.disconnect(viewer)
    }

    // ----- rosters and assets -----

    /// Create a roster.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers and `BadRequest` for an
    /// empty name.
    pub fn add_roster(
        &self,
        caller: &Caller,
        name: &str,
        owner: Option<UserId>,
        coins: u32,
    ) -> EngineResult<RosterId> {
        caller.require_privileged()?;
        if name.trim().is_empty() {
            return Err(EngineError::BadRequest("roster name must not be empty".into()));
        }
        self.store.transact(|t| Ok(t.add_roster(name, owner, coins)))
    }

    /// Look up a roster.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown roster.
    pub fn roster(&self, id: RosterId) -> EngineResult<Roster> {
        self.store.read(|t| t.roster(id).cloned())
    }

    /// Units owned by a roster.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown roster.
    pub fn roster_units(&self, roster: RosterId) -> EngineResult<Vec<Unit>> {
        self.store.read(|t| {
            t.roster(roster)?;
            Ok(t.units_of(roster))
        })
    }

    /// Look up a unit.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown unit.
    pub fn asset(&self, id: UnitId) -> EngineResult<Unit> {
        self.store.read(|t| t.unit(id).cloned())
    }

    /// The store pool grouped by asset name.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn store_listing(&self) -> EngineResult<Vec<StoreListing>> {
        self.store.read(|t| Ok(ledger::store_listing(t)))
    }

    /// Put new units on sale.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`ledger::restock`].
    pub fn restock(
        &self,
        caller: &Caller,
        template: &UnitTemplate,
        count: u32,
        locked_by: Option<RosterId>,
    ) -> EngineResult<Vec<UnitId>> {
        caller.require_privileged()?;
        let ids = self
            .store
            .transact(|t| ledger::restock(t, template, count, locked_by, &self.config))?;
        info!(name = %template.name, count, ?locked_by, "store restocked");
        Ok(ids)
    }

    /// Create a unit directly in a roster.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`ledger::enroll`].
    pub fn enroll(
        &self,
        caller: &Caller,
        roster: RosterId,
        template: &UnitTemplate,
        status: UnitStatus,
    ) -> EngineResult<UnitId> {
        caller.require_privileged()?;
        self.store
            .transact(|t| ledger::enroll(t, roster, template, status, &self.config))
    }

    /// Import a unit record that may lack base stats.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, `BadRequest` if the id
    /// is taken or the record cannot be back-derived, and `NotFound` if the
    /// owner or lock holder is unknown.
    pub fn import_legacy(&self, caller: &Caller, record: LegacyUnitRecord) -> EngineResult<UnitId> {
        caller.require_privileged()?;
        self.store.transact(|t| {
            if t.units.contains_key(&record.id) {
                return Err(EngineError::BadRequest(format!("unit id {} is taken", record.id)));
            }
            for roster in [record.owner, record.locked_by, record.unlocked_for].into_iter().flatten() {
                t.roster(roster)?;
            }
            let unit = Unit::from_legacy(record, &self.config)?;
            let id = unit.id;
            t.seq.units.reserve(id);
            t.units.insert(id, unit);
            Ok(id)
        })
    }

    /// Ask the lock holder of a store unit for access to buy it.
    ///
    /// The lock holder's owner receives a notification and a push.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ledger::request_access`], or `Internal` if the
    /// notification cannot be stored (the request is then discarded).
    pub fn request_access(&self, caller: &Caller, asset: UnitId) -> EngineResult<AccessRequest> {
        let asker = caller.roster()?;
        let now = self.now();
        let (request, notice) = self.store.transact(|t| {
            let request = ledger::request_access(t, asker, asset, now)?;
            let message = format!(
                "**{}** has requested access to purchase **{}** from your kingdom.",
                t.roster(asker)?.name,
                t.unit(asset)?.name
            );
            let recipient = t.roster_owner(request.locker);
            match recipient {
                Some(user) => self.notifier.record(user, ACCESS_REQUEST_TITLE, &message, now)?,
                None => warn!(roster = request.locker, "lock holder has no owner to notify"),
            }
            Ok((request, recipient.map(|user| (user, message))))
        })?;

        if let Some((user, message)) = notice {
            self.push_notice(user, ACCESS_REQUEST_TITLE, message);
        }
        info!(asset, requester = asker, "access requested");
        Ok(request)
    }

    /// Release a locked unit to the latest requester.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ledger::decide_access`].
    pub fn approve_access(
        &self,
        caller: &Caller,
        asset: UnitId,
        requester: RosterId,
    ) -> EngineResult<AccessRequest> {
        self.decide_access(caller, asset, requester, AccessDecision::Approve)
    }

    /// Refuse the latest request for a locked unit.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ledger::decide_access`].
    pub fn deny_access(
        &self,
        caller: &Caller,
        asset: UnitId,
        requester: RosterId,
    ) -> EngineResult<AccessRequest> {
        self.decide_access(caller, asset, requester, AccessDecision::Deny)
    }

    fn decide_access(
        &self,
        caller: &Caller,
        asset: UnitId,
        requester: RosterId,
        decision: AccessDecision,
    ) -> EngineResult<AccessRequest> {
        let decider = caller.roster()?;
        let now = self.now();
        let (request, name, recipient) = self.store.transact(|t| {
            let request = ledger::decide_access(t, decider, asset, requester, decision, now)?;
            Ok((request, t.unit(asset)?.name.clone(), t.roster_owner(requester)))
        })?;

        let (title, message) = match decision {
            AccessDecision::Approve => (
                ACCESS_APPROVED_TITLE,
                format!(
                    "Your request to purchase **{name}** has been approved! You can now purchase this asset from the store."
                ),
            ),
            AccessDecision::Deny => (
                ACCESS_DENIED_TITLE,
                format!("Your request to purchase **{name}** has been denied."),
            ),
        };
        if let Some(user) = recipient {
            // The decision stands even if the requester cannot be told.
            if let Err(e) = self.notifier.record(user, title, &message, now) {
                warn!(user, error = %e, "failed to store access decision notification");
            }
            self.push_notice(user, title, message);
        }
        info!(asset, requester, ?decision, "access decided");
        Ok(request)
    }

    /// Latest access request from `requester` for `asset`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is none, and `Forbidden` unless the caller
    /// is the requester, the lock holder, or an administrator.
    pub fn access_request(
        &self,
        caller: &Caller,
        asset: UnitId,
        requester: RosterId,
    ) -> EngineResult<AccessRequest> {
        self.store.read(|t| {
            let request = t
                .access_requests
                .values()
                .filter(|r| r.asset == asset && r.requester == requester)
                .max_by_key(|r| r.id)
                .ok_or_else(|| EngineError::NotFound(format!("access request for asset {asset}")))?;
            if !(caller.acts_for(request.requester) || caller.acts_for(request.locker)) {
                return Err(EngineError::Forbidden("not your access request".into()));
            }
            Ok(request.clone())
        })
    }

    /// Buy a store unit by name.
    ///
    /// Business rejections (locked, unaffordable) come back as a receipt with
    /// `success == false` and the unchanged balance.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for callers without a roster, `NotFound` for an
    /// unknown asset name, and `Internal` on store failure.
    pub fn purchase(&self, caller: &Caller, asset_name: &str) -> EngineResult<PurchaseReceipt> {
        let buyer = caller.roster()?;
        let outcome = self.store.transact(|t| {
            let before = t.clone();
            match ledger::purchase(t, buyer, asset_name) {
                Ok(bought) => Ok(Ok(bought)),
                Err(e) if e.is_rejection() => {
                    *t = before;
                    let coins = t.roster(buyer)?.coins;
                    Ok(Err((e, coins)))
                }
                Err(e) => Err(e),
            }
        })?;
        Ok(match outcome {
            Ok(bought) => PurchaseReceipt {
                success: true,
                message: format!("Successfully purchased {}", bought.name),
                coins: bought.coins,
                unit: Some(bought.unit),
            },
            Err((e, coins)) => {
                info!(buyer, asset = asset_name, reason = %e, "purchase rejected");
                PurchaseReceipt {
                    success: false,
                    message: e.to_string(),
                    coins,
                    unit: None,
                }
            }
        })
    }

    /// Grant experience to a unit.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` unless the caller owns the unit or is an
    /// administrator, plus the errors of [`ledger::grant_experience`].
    pub fn grant_experience(
        &self,
        caller: &Caller,
        unit: UnitId,
        xp: u32,
    ) -> EngineResult<ExperienceReport> {
        self.store.transact(|t| {
            let owner = t.unit(unit)?.owner;
            if !owner.is_some_and(|o| caller.acts_for(o)) && !caller.privileged {
                return Err(EngineError::Forbidden("not your asset".into()));
            }
            ledger::grant_experience(t, unit, xp, &self.config)
        })
    }

    // ----- games -----

    /// Create a game.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`grid::create_game`].
    pub fn create_game(&self, caller: &Caller, setup: GameSetup) -> EngineResult<GameId> {
        caller.require_privileged()?;
        let now = self.now();
        let id = self
            .store
            .transact(|t| grid::create_game(t, setup, &self.config, now))?;
        info!(game = id, "game created");
        Ok(id)
    }

    /// A game with its board and running battle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown game.
    pub fn game(&self, id: GameId) -> EngineResult<GameView> {
        self.store.read(|t| {
            let game = t.game(id)?.clone();
            let battle = game.battle_id.map(|b| battle_view(t, b)).transpose()?;
            Ok(GameView {
                cells: grid::cells_of(t, id),
                game,
                battle,
            })
        })
    }

    /// Every game, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn games(&self) -> EngineResult<Vec<Game>> {
        self.store.read(|t| Ok(t.games.values().cloned().collect()))
    }

    /// Render a game board as text.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown game.
    pub fn render(&self, game: GameId, color: bool) -> EngineResult<String> {
        self.store.read(|t| grid::render_board(t, game, color))
    }

    /// Rename a game or change its thumbnail.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers and `NotFound` for an
    /// unknown game.
    pub fn update_game(
        &self,
        caller: &Caller,
        game: GameId,
        name: Option<String>,
        thumbnail: Option<String>,
    ) -> EngineResult<()> {
        caller.require_privileged()?;
        self.store
            .transact(|t| grid::update_game(t, game, name, thumbnail))?;
        self.announce(game);
        Ok(())
    }

    /// Delete a game and its board.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers and `NotFound` for an
    /// unknown game.
    pub fn delete_game(&self, caller: &Caller, game: GameId) -> EngineResult<()> {
        caller.require_privileged()?;
        self.store.transact(|t| grid::delete_game(t, game))?;
        info!(game, "game deleted");
        self.announce(game);
        Ok(())
    }

    /// Replace a cell's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`grid::update_cell`].
    pub fn update_cell(&self, caller: &Caller, cell: CellId, update: CellUpdate) -> EngineResult<()> {
        caller.require_privileged()?;
        let game = self.store.transact(|t| grid::update_cell(t, cell, update))?;
        self.announce(game);
        Ok(())
    }

    /// Place one of the caller's warriors on a cell.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for callers without a roster, plus the errors of
    /// [`grid::place_unit`].
    pub fn place_unit(&self, caller: &Caller, cell: CellId, unit: UnitId) -> EngineResult<()> {
        let roster = caller.roster()?;
        let game = self
            .store
            .transact(|t| grid::place_unit(t, roster, cell, unit))?;
        self.announce(game);
        Ok(())
    }

    /// Move one of the caller's units between cells.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for callers without a roster, plus the errors of
    /// [`grid::move_unit`].
    pub fn move_unit(&self, caller: &Caller, from: CellId, to: CellId, unit: UnitId) -> EngineResult<()> {
        let roster = caller.roster()?;
        let game = self
            .store
            .transact(|t| grid::move_unit(t, roster, from, to, unit))?;
        self.announce(game);
        Ok(())
    }

    // ----- turns -----

    /// Advance the turn if the window has run out. Open to anyone.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`turn::advance_turn`].
    pub fn advance_turn(&self, game: GameId) -> EngineResult<TurnOutcome> {
        let outcome = self.store.transact(|t| {
            // Read the clock under the lock so concurrent callers see ordered times.
            let now = self.now();
            turn::advance_turn(t, game, now, &self.config)
        })?;
        if outcome.advanced {
            self.announce(game);
        }
        Ok(outcome)
    }

    /// Give the turn to a roster immediately.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`turn::set_turn`].
    pub fn set_turn(&self, caller: &Caller, game: GameId, roster: RosterId) -> EngineResult<TurnOutcome> {
        caller.require_privileged()?;
        let now = self.now();
        let outcome = self
            .store
            .transact(|t| turn::set_turn(t, game, roster, now, &self.config))?;
        self.announce(game);
        Ok(outcome)
    }

    // ----- battles -----

    /// Start a battle. Players may only attack with their own roster.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if a player attacks for another roster, plus the
    /// errors of [`battle::create_battle`].
    pub fn create_battle(&self, caller: &Caller, setup: BattleSetup) -> EngineResult<BattleId> {
        if !caller.acts_for(setup.attacker.roster) {
            return Err(EngineError::Forbidden("you can only attack with your own roster".into()));
        }
        let now = self.now();
        let game = setup.game;
        let id = self.store.transact(|t| battle::create_battle(t, setup, now))?;
        if let Some(game) = game {
            self.announce(game);
        }
        Ok(id)
    }

    /// A battle with its units and questions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown battle.
    pub fn battle(&self, id: BattleId) -> EngineResult<BattleView> {
        self.store.read(|t| battle_view(t, id))
    }

    /// Every battle, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn battles(&self) -> EngineResult<Vec<Battle>> {
        self.store.read(|t| Ok(t.battles.values().cloned().collect()))
    }

    /// Rename a battle and edit its questions.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`battle::update_battle`].
    pub fn update_battle(
        &self,
        caller: &Caller,
        id: BattleId,
        name: Option<String>,
        reward: Option<String>,
        questions: &[QuestionDraft],
    ) -> EngineResult<()> {
        caller.require_privileged()?;
        self.store
            .transact(|t| battle::update_battle(t, id, name, reward, questions))
    }

    /// Hand questions to participants.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`battle::assign_questions`].
    pub fn assign_questions(
        &self,
        caller: &Caller,
        id: BattleId,
        assignments: &[QuestionAssignment],
    ) -> EngineResult<()> {
        caller.require_privileged()?;
        self.store
            .transact(|t| battle::assign_questions(t, id, assignments))
    }

    /// Open a battle for answers.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`battle::start_battle`].
    pub fn start_battle(&self, caller: &Caller, id: BattleId) -> EngineResult<()> {
        caller.require_privileged()?;
        let game = self.store.transact(|t| {
            battle::start_battle(t, id)?;
            Ok(t.battle(id)?.game)
        })?;
        if let Some(game) = game {
            self.announce(game);
        }
        Ok(())
    }

    /// End a battle without damage.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`battle::stop_battle`].
    pub fn stop_battle(&self, caller: &Caller, id: BattleId) -> EngineResult<()> {
        caller.require_privileged()?;
        let now = self.now();
        let released = self.store.transact(|t| battle::stop_battle(t, id, now))?;
        info!(battle = id, "battle stopped");
        if let Some(game) = released {
            self.announce(game);
        }
        Ok(())
    }

    /// Record the caller's answer.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for callers without a roster, plus the errors of
    /// [`battle::submit_answer`].
    pub fn submit_answer(&self, caller: &Caller, question: QuestionId, answer: &str) -> EngineResult<BattleId> {
        let roster = caller.roster()?;
        let now = self.now();
        self.store
            .transact(|t| battle::submit_answer(t, roster, question, answer, now))
    }

    /// Record grades.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`battle::grade`].
    pub fn grade(&self, caller: &Caller, grades: &[QuestionGrade]) -> EngineResult<()> {
        caller.require_privileged()?;
        self.store.transact(|t| battle::grade(t, grades))
    }

    /// Oldest open question waiting on `roster`.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` unless the caller plays `roster` or is an
    /// administrator.
    pub fn unanswered_question(&self, caller: &Caller, roster: RosterId) -> EngineResult<Option<BattleQuestion>> {
        if !caller.acts_for(roster) {
            return Err(EngineError::Forbidden("not your roster".into()));
        }
        self.store.read(|t| Ok(battle::unanswered_question(t, roster)))
    }

    /// Resolve a battle and apply its damage.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-privileged callers, plus the errors of
    /// [`battle::resolve_battle`].
    pub fn complete_battle(&self, caller: &Caller, id: BattleId) -> EngineResult<Resolution> {
        caller.require_privileged()?;
        let now = self.now();
        let resolution = self
            .store
            .transact(|t| battle::resolve_battle(t, id, &self.config, now))?;
        let board = resolution.released_game.or_else(|| {
            self.store
                .read(|t| Ok(t.battle(id)?.game))
                .ok()
                .flatten()
        });
        if let Some(game) = board {
            self.announce(game);
        }
        Ok(resolution)
    }
}
