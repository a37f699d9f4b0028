//! In-memory persistence.
//!
//! Tables are persistent maps, so a transaction stages its writes on a clone
//! of the whole database in O(1) and commits by swapping the clone in. A
//! closure that returns `Err` leaves the committed state untouched.

use crate::battle::{Battle, BattleId, BattleQuestion, QuestionId};
use crate::error::{EngineError, EngineResult};
use crate::grid::{Cell, CellId, Game, GameId};
use crate::ledger::{AccessRequest, RequestId, Roster, RosterId, Unit, UnitId, UserId};
use im::OrdMap;
use std::sync::RwLock;

/// Monotonic id allocator for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequence(u64);

impl Sequence {
    /// Allocate the next id. Ids start at 1.
    pub fn next_id(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// Make sure future ids skip past an externally assigned `id`.
    pub fn reserve(&mut self, id: u64) {
        self.0 = self.0.max(id);
    }
}

/// Id sequences for every table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequences {
    /// Rosters.
    pub rosters: Sequence,
    /// Units.
    pub units: Sequence,
    /// Games.
    pub games: Sequence,
    /// Cells.
    pub cells: Sequence,
    /// Battles.
    pub battles: Sequence,
    /// Battle questions.
    pub questions: Sequence,
    /// Access requests.
    pub access_requests: Sequence,
}

/// The whole database.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    /// Rosters by id.
    pub rosters: OrdMap<RosterId, Roster>,
    /// Units by id.
    pub units: OrdMap<UnitId, Unit>,
    /// Games by id.
    pub games: OrdMap<GameId, Game>,
    /// Cells by id.
    pub cells: OrdMap<CellId, Cell>,
    /// Battles by id.
    pub battles: OrdMap<BattleId, Battle>,
    /// Battle questions by id.
    pub questions: OrdMap<QuestionId, BattleQuestion>,
    /// Access requests by id; higher ids are more recent.
    pub access_requests: OrdMap<RequestId, AccessRequest>,
    /// Id allocators.
    pub seq: Sequences,
}

macro_rules! lookup {
    ($get:ident, $get_mut:ident, $table:ident, $id:ty, $row:ty, $kind:literal) => {
        #[doc = concat!("Look up a ", $kind, " by id.")]
        ///
        /// # Errors
        ///
        /// Returns `NotFound` if no such row exists.
        pub fn $get(&self, id: $id) -> EngineResult<&$row> {
            self.$table.get(&id).ok_or_else(|| EngineError::missing($kind, id))
        }

        #[doc = concat!("Look up a ", $kind, " by id for mutation.")]
        ///
        /// # Errors
        ///
        /// Returns `NotFound` if no such row exists.
        pub fn $get_mut(&mut self, id: $id) -> EngineResult<&mut $row> {
            self.$table
                .get_mut(&id)
                .ok_or_else(|| EngineError::missing($kind, id))
        }
    };
}

impl Tables {
    lookup!(roster, roster_mut, rosters, RosterId, Roster, "roster");
    lookup!(unit, unit_mut, units, UnitId, Unit, "asset");
    lookup!(game, game_mut, games, GameId, Game, "game");
    lookup!(cell, cell_mut, cells, CellId, Cell, "cell");
    lookup!(battle, battle_mut, battles, BattleId, Battle, "battle");
    lookup!(question, question_mut, questions, QuestionId, BattleQuestion, "question");

    /// Create a roster and return its id.
    pub fn add_roster(&mut self, name: &str, owner: Option<UserId>, coins: u32) -> RosterId {
        let id = self.seq.rosters.next_id();
        self.rosters.insert(id, Roster::new(id, name, owner, coins));
        id
    }

    /// The user controlling `roster`, if any.
    #[must_use]
    pub fn roster_owner(&self, roster: RosterId) -> Option<UserId> {
        self.rosters.get(&roster).and_then(|r| r.owner)
    }

    /// Units owned by `roster`, in id order.
    #[must_use]
    pub fn units_of(&self, roster: RosterId) -> Vec<Unit> {
        self.units
            .values()
            .filter(|u| u.owner == Some(roster))
            .cloned()
            .collect()
    }
}

/// Transactional store shared by every request thread.
#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    /// Create a store over existing tables.
    #[must_use]
    pub fn new(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Run a read-only query against committed state.
    ///
    /// # Errors
    ///
    /// Propagates the query's error, or `Internal` if the lock is poisoned.
    pub fn read<T>(&self, query: impl FnOnce(&Tables) -> EngineResult<T>) -> EngineResult<T> {
        let tables = self
            .tables
            .read()
            .map_err(|_| EngineError::Internal("store lock poisoned".into()))?;
        query(&tables)
    }

    /// Run a mutation under the exclusive lock, committing only on success.
    ///
    /// # Errors
    ///
    /// Propagates the mutation's error (nothing is committed), or `Internal`
    /// if the lock is poisoned.
    pub fn transact<T>(
        &self,
        mutation: impl FnOnce(&mut Tables) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| EngineError::Internal("store lock poisoned".into()))?;
        let mut staged = tables.clone();
        let value = mutation(&mut staged)?;
        *tables = staged;
        Ok(value)
    }

    /// Clone of the committed state.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the lock is poisoned.
    pub fn snapshot(&self) -> EngineResult<Tables> {
        self.read(|tables| Ok(tables.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_start_at_one() {
        let mut seq = Sequence::default();
        assert_eq!(seq.next_id(), 1);
        assert_eq!(seq.next_id(), 2);
        seq.reserve(10);
        assert_eq!(seq.next_id(), 11);
        seq.reserve(3);
        assert_eq!(seq.next_id(), 12);
    }

    #[test]
    fn test_transact_commits_on_ok() {
        let store = Store::default();
        let id = store.transact(|t| Ok(t.add_roster("North", Some(1), 50))).unwrap();
        let coins = store.read(|t| Ok(t.roster(id)?.coins)).unwrap();
        assert_eq!(coins, 50);
    }

    #[test]
    fn test_transact_discards_on_err() {
        let store = Store::default();
        let id = store.transact(|t| Ok(t.add_roster("North", Some(1), 50))).unwrap();

        let result: EngineResult<()> = store.transact(|t| {
            t.roster_mut(id)?.coins = 0;
            t.add_roster("South", None, 10);
            Err(EngineError::rejected("abort"))
        });
        assert!(result.is_err());

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.roster(id).unwrap().coins, 50);
        assert_eq!(snapshot.rosters.len(), 1);
        // Aborted allocations are not committed either.
        assert_eq!(snapshot.seq.rosters, Sequence(1));
    }

    #[test]
    fn test_lookup_not_found() {
        let tables = Tables::default();
        assert_eq!(tables.game(4).unwrap_err(), EngineError::missing("game", 4));
    }
}
