//! Identity types and the client-facing message set.
//!
//! Everything in here travels between a client and the table server:
//! the request envelope a client sends, the acknowledgement it gets back,
//! and the notifications pushed to it without a request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's identity as bound to their session by the transport layer.
///
/// Opaque to this server: it is compared and stored, never parsed.
/// `#[serde(transparent)]` keeps it a plain JSON string, which also lets
/// it be used as a JSON map key.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Uid(pub String);

impl Uid {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifies one match configuration (game type, seats, stake).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct MatchId(pub i32);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// A table's short, human-shareable number (five digits in production).
///
/// Players type this number into their client to join a friend's room,
/// so it is displayed bare, without a prefix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct TableId(pub i32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle the transport layer uses for one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Per-room integer properties chosen by the room creator (rule toggles,
/// stake multipliers, ...). Ordered so encoded output is stable.
pub type PropertyMap = BTreeMap<String, i32>;

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Payload of a room-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateRoomReq {
    /// How many rounds the room is set up to play.
    pub game_count: i32,

    /// Free-form room description shown to joining players.
    #[serde(default)]
    pub desn: String,

    /// Per-room properties forwarded to the game engine untouched.
    #[serde(default)]
    pub properties: PropertyMap,
}

/// The tagged request payload inside a [`MatchRequest`].
///
/// Internally tagged: `{ "type": "JoinRoom", "table_id": 12345 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Open a new room and take its first seat.
    CreateRoom(CreateRoomReq),
    /// Take a seat at an existing room.
    JoinRoom { table_id: TableId },
    /// Tear down a room the caller is seated at.
    CancelRoom { table_id: TableId },
    /// Leave the caller's current room.
    ExitMatch,
    /// Fetch the accumulated result of the caller's current room.
    FdResult,
}

/// Top-level client envelope: which match the request is for, and what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub match_id: MatchId,
    pub req: ClientRequest,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// "You are in a room": sent on create/join and again on reconnect so a
/// client can resynchronise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartClientAck {
    pub match_type: String,
    pub game_type: String,
    pub server_id: String,
    pub match_id: MatchId,
    pub table_id: TableId,
    pub desn: String,
    pub properties: PropertyMap,
}

/// One finished round as recorded in a table's result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundRecord {
    pub game_count: i32,
    pub deltas: BTreeMap<Uid, i64>,
    pub data: String,
}

/// Per-round result push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub table_id: TableId,
    pub cur_game_count: i32,
    /// Score change of this round only.
    pub deltas: BTreeMap<Uid, i64>,
    /// Accumulated scores after this round.
    pub scores: BTreeMap<Uid, i64>,
    pub player_data: BTreeMap<Uid, String>,
    pub round_data: String,
}

/// A table's accumulated result: the answer to an `FdResult` query and
/// the payload of the final push when the table ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdResult {
    pub table_id: TableId,
    pub owner: Option<Uid>,
    pub desn: String,
    pub game_count: i32,
    pub scores: BTreeMap<Uid, i64>,
    pub player_data: BTreeMap<Uid, String>,
    pub rounds: Vec<RoundRecord>,
}

impl FdResult {
    /// An empty result for a freshly created table.
    pub fn new(table_id: TableId) -> Self {
        Self {
            table_id,
            owner: None,
            desn: String::new(),
            game_count: 0,
            scores: BTreeMap::new(),
            player_data: BTreeMap::new(),
            rounds: Vec::new(),
        }
    }
}

/// The tagged answer to a [`ClientRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientAck {
    StartClient(StartClientAck),
    CancelRoom { table_id: TableId },
    ExitMatch,
    FdResult(FdResult),
    /// The request failed. `code` is stable across releases, `message`
    /// is for humans.
    Error { code: u16, message: String },
}

/// Top-level answer envelope, stamped with the serving node and match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAck {
    pub server_id: String,
    pub match_id: MatchId,
    pub ack: ClientAck,
}

/// A notification the server sends without a client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Push {
    StartClient(StartClientAck),
    RoundResult(RoundResult),
    MatchResult(FdResult),
}

/// A push stamped with the serving node and match, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPush {
    pub server_id: String,
    pub match_id: MatchId,
    pub push: Push,
}

#[cfg(test)]
mod tests {
    //! The client SDK parses these shapes directly, so the tests pin the
    //! JSON layout rather than round-tripping every type.

    use super::*;

    #[test]
    fn test_uid_serializes_as_plain_string() {
        let json = serde_json::to_string(&Uid::from("alice")).unwrap();
        assert_eq!(json, r#""alice""#);
    }

    #[test]
    fn test_table_id_display_is_bare_number() {
        assert_eq!(TableId(12345).to_string(), "12345");
        assert_eq!(MatchId(7).to_string(), "M-7");
    }

    #[test]
    fn test_join_room_request_is_internally_tagged() {
        let req = MatchRequest {
            match_id: MatchId(1001),
            req: ClientRequest::JoinRoom {
                table_id: TableId(54321),
            },
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["match_id"], 1001);
        assert_eq!(value["req"]["type"], "JoinRoom");
        assert_eq!(value["req"]["table_id"], 54321);
    }

    #[test]
    fn test_create_room_request_defaults_optional_fields() {
        let json = r#"{"match_id":1,"req":{"type":"CreateRoom","game_count":8}}"#;
        let req: MatchRequest = serde_json::from_str(json).unwrap();
        match req.req {
            ClientRequest::CreateRoom(create) => {
                assert_eq!(create.game_count, 8);
                assert!(create.desn.is_empty());
                assert!(create.properties.is_empty());
            }
            other => panic!("expected CreateRoom, got {other:?}"),
        }
    }

    #[test]
    fn test_unit_variant_decodes_from_tag_only() {
        let req: ClientRequest =
            serde_json::from_str(r#"{"type":"ExitMatch"}"#).unwrap();
        assert_eq!(req, ClientRequest::ExitMatch);
    }

    #[test]
    fn test_scores_map_uses_uid_keys() {
        let mut scores = BTreeMap::new();
        scores.insert(Uid::from("a"), 50);
        scores.insert(Uid::from("b"), -50);
        let push = Push::RoundResult(RoundResult {
            table_id: TableId(10001),
            cur_game_count: 1,
            deltas: scores.clone(),
            scores,
            player_data: BTreeMap::new(),
            round_data: String::new(),
        });
        let value = serde_json::to_value(&push).unwrap();
        assert_eq!(value["type"], "RoundResult");
        assert_eq!(value["deltas"]["a"], 50);
        assert_eq!(value["scores"]["b"], -50);
    }

    #[test]
    fn test_error_ack_shape() {
        let ack = ClientAck::Error {
            code: 409,
            message: "already in match".into(),
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["type"], "Error");
        assert_eq!(value["code"], 409);
    }
}
