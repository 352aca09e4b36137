//! Match configuration and the table state machine.

use std::path::Path;

use fdtable_protocol::{MatchId, PropertyMap};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Match type every table on this server reports to clients and engines.
pub const MATCH_TYPE: &str = "fdtable";

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Static configuration for one match, loaded from one JSON file.
///
/// ```json
/// { "match_id": 1001, "name": "Friends 4p", "game_type": "mahjong",
///   "player_per_table": 4, "initial_chips": 1000, "score_base": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub match_id: MatchId,

    /// Display name for lobby listings.
    #[serde(default)]
    pub name: String,

    /// Selects the engine route (`"<game_type>.remote.message"`).
    pub game_type: String,

    /// Seats per table. Must be at least 1.
    pub player_per_table: u32,

    /// Chips each player starts a table with.
    #[serde(default)]
    pub initial_chips: i64,

    /// Score unit forwarded to the engine.
    #[serde(default = "default_score_base")]
    pub score_base: i64,

    /// Default engine properties for every table of this match.
    #[serde(default)]
    pub property: PropertyMap,

    /// Entry condition shown in lobby listings.
    #[serde(default)]
    pub sign_condition: String,
}

fn default_score_base() -> i64 {
    1
}

impl MatchConfig {
    /// Rejects configurations no table could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_per_table == 0 {
            return Err(ConfigError::Invalid(format!(
                "match {}: player_per_table must be at least 1",
                self.match_id
            )));
        }
        if self.game_type.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "match {}: game_type is empty",
                self.match_id
            )));
        }
        Ok(())
    }

    /// Reads, parses and validates one config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// TableStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a table.
///
/// ```text
/// Waiting → Playing → Ended
/// ```
///
/// - **Waiting**: the actor exists but the engine has not acknowledged
///   the table yet.
/// - **Playing**: the engine accepted the table. Players join, leave and
///   play rounds.
/// - **Ended**: terminal. The table is out of the match's map and its ID
///   is back in the allocator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TableStatus {
    Waiting,
    Playing,
    Ended,
}

impl TableStatus {
    pub fn is_ended(self) -> bool {
        matches!(self, Self::Ended)
    }

    /// The next state in the normal progression.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Playing),
            Self::Playing => Some(Self::Ended),
            Self::Ended => None,
        }
    }

    /// Transitions only move forward. A table that never reached
    /// `Playing` may still end.
    pub fn can_transition_to(self, target: Self) -> bool {
        target > self
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Playing => write!(f, "Playing"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}
