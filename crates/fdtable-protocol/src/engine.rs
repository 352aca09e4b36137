//! Server-to-server messages: requests to the game engine, events the
//! engine (or the proxy) sends back, and the occupancy report sent to the
//! listing service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{MatchId, PropertyMap, TableId, Uid};

// ---------------------------------------------------------------------------
// Table server → game engine
// ---------------------------------------------------------------------------

/// Why a table is being torn down on the engine side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// A seated player explicitly cancelled the room.
    Cancelled,
    /// The last seated player left.
    Abandoned,
}

/// Everything the engine needs to open a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTableReq {
    /// Match-level default properties.
    pub property: PropertyMap,
    pub score_base: i64,
    pub match_type: String,
    /// Rounds the room is set up to play.
    pub game_count: i32,
    /// Seats at the table.
    pub player_count: u32,
    pub creator: Uid,
    pub desn: String,
    /// Per-room properties chosen by the creator.
    pub fdproperty: PropertyMap,
}

/// The tagged body of a [`GameRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineRequest {
    AddTable(AddTableReq),
    AddPlayer { uid: Uid, seat: u32, score: i64 },
    CancelTable { reason: CancelReason },
    ExitTable { uid: Uid },
    NetState { uid: Uid, online: bool },
}

impl EngineRequest {
    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddTable(_) => "AddTable",
            Self::AddPlayer { .. } => "AddPlayer",
            Self::CancelTable { .. } => "CancelTable",
            Self::ExitTable { .. } => "ExitTable",
            Self::NetState { .. } => "NetState",
        }
    }
}

/// Envelope for every engine RPC: the engine keys its tables by
/// `(match_id, table_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRequest {
    pub match_id: MatchId,
    pub table_id: TableId,
    pub req: EngineRequest,
}

/// The engine's answer. `code == 0` means accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameAck {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl GameAck {
    /// An accepting answer.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A rejecting answer with a reason.
    pub fn rejected(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

// ---------------------------------------------------------------------------
// Game engine / proxy → table server
// ---------------------------------------------------------------------------

/// The engine's report of one finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResultUpdate {
    pub table_id: TableId,
    pub cur_game_count: i32,
    /// Score change per player for this round.
    pub scores: BTreeMap<Uid, i64>,
    /// Auxiliary per-player data; replaces what the table held before.
    #[serde(default)]
    pub player_data: BTreeMap<Uid, String>,
    #[serde(default)]
    pub round_data: String,
}

/// Events that arrive without a client request driving them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A player's connection went up or down (reported by the proxy).
    NetState { uid: Uid, online: bool },
    GameResult(GameResultUpdate),
    GameOver { table_id: TableId },
}

/// Envelope for engine/proxy-originated events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub match_id: MatchId,
    pub event: EngineEvent,
}

// ---------------------------------------------------------------------------
// Table server → listing service
// ---------------------------------------------------------------------------

/// Coarse occupancy of one match, for lobby listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOccupancy {
    pub match_id: MatchId,
    pub name: String,
    pub game_type: String,
    pub match_type: String,
    pub server_id: String,
    pub sign_condition: String,
    pub online: u32,
}

/// One reporting tick's worth of occupancy, across every match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OccupancyReport {
    pub entries: Vec<MatchOccupancy>,
}
