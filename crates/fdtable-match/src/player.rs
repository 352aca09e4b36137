//! Active players and the registry that enforces one match per player.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fdtable_protocol::{MatchId, TableId, Uid};

use crate::MatchError;

/// A player who currently holds (or is about to take) a seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub uid: Uid,
    pub match_id: MatchId,
    pub table_id: TableId,
    /// `None` until the table has seated the player.
    pub seat: Option<u32>,
    pub online: bool,
    /// Chips: the match's initial stake plus every round delta so far.
    pub score: i64,
}

/// Concurrent uid → [`Player`] store shared by every match on the node.
///
/// An entry is created when a player creates or joins a room and removed
/// when they leave it or the table ends. A uid maps to at most one entry.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Mutex<HashMap<Uid, Player>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uid, Player>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the player's entry.
    pub fn load(&self, uid: &Uid) -> Option<Player> {
        self.lock().get(uid).cloned()
    }

    /// Creates the entry for `uid`, not yet seated and online.
    ///
    /// Callers check [`load`](Self::load) first under their own admission
    /// lock; the insert itself is still insert-if-absent so two matches
    /// racing on the same uid cannot both win.
    ///
    /// # Errors
    /// [`MatchError::AlreadyInMatch`] if `uid` already has an entry.
    pub fn store(
        &self,
        uid: Uid,
        match_id: MatchId,
        table_id: TableId,
        initial_score: i64,
    ) -> Result<Player, MatchError> {
        let mut players = self.lock();
        if players.contains_key(&uid) {
            return Err(MatchError::AlreadyInMatch(uid));
        }
        let player = Player {
            uid: uid.clone(),
            match_id,
            table_id,
            seat: None,
            online: true,
            score: initial_score,
        };
        players.insert(uid, player.clone());
        Ok(player)
    }

    /// Removes the entry for `uid`, returning it.
    pub fn delete(&self, uid: &Uid) -> Option<Player> {
        self.lock().remove(uid)
    }

    /// Removes the entry for `uid` only if `pred` holds for it.
    pub fn delete_if(
        &self,
        uid: &Uid,
        pred: impl FnOnce(&Player) -> bool,
    ) -> Option<Player> {
        let mut players = self.lock();
        if players.get(uid).is_some_and(pred) {
            players.remove(uid)
        } else {
            None
        }
    }

    /// Applies `f` to the entry for `uid`. Returns `false` if there is none.
    pub fn update(&self, uid: &Uid, f: impl FnOnce(&mut Player)) -> bool {
        match self.lock().get_mut(uid) {
            Some(player) => {
                f(player);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
