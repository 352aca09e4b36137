//! Wire protocol for the fdtable server.
//!
//! This crate defines every message that crosses a process boundary:
//!
//! - **Client messages** ([`MatchRequest`], [`MatchAck`], [`MatchPush`]):
//!   what players send and receive.
//! - **Engine messages** ([`GameRequest`], [`RemoteRequest`]): what the
//!   table server exchanges with the game-logic engine.
//! - **Reports** ([`OccupancyReport`]): what the listing service receives.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages turn
//!   into bytes and back.
//!
//! It knows nothing about tables or sessions; it only knows shapes.

mod codec;
mod engine;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use engine::{
    AddTableReq, CancelReason, EngineEvent, EngineRequest, GameAck,
    GameRequest, GameResultUpdate, MatchOccupancy, OccupancyReport,
    RemoteRequest,
};
pub use error::ProtocolError;
pub use types::{
    ClientAck, ClientRequest, CreateRoomReq, FdResult, MatchAck, MatchId,
    MatchPush, MatchRequest, PropertyMap, Push, RoundRecord, RoundResult,
    SessionId, StartClientAck, TableId, Uid,
};
