//! # fdtable
//!
//! Table server for turn-based card and tile games.
//!
//! fdtable assigns table IDs, seats players, keeps one active match per
//! player and relays room lifecycle and round results between clients and
//! an external game engine. The engine owns the game rules; fdtable owns
//! who sits where.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fdtable::prelude::*;
//!
//! // Provide a GameEngine, SessionGateway, BindingStore and
//! // OccupancyReporter, then:
//! // let server = FdTableServer::builder()
//! //     .server_id("fdtable-1")
//! //     .config_dir("config/matches")
//! //     .build(engine, gateway, bindings, reporter)?;
//! // let dispatcher = server.dispatcher(); // hand to the transport
//! // server.run().await
//! ```

mod context;
mod error;
mod handler;
mod server;
mod telemetry;

pub use context::ServerContext;
pub use error::FdTableError;
pub use handler::Dispatcher;
pub use server::{DEFAULT_REPORT_INTERVAL, FdTableServer, FdTableServerBuilder};
pub use telemetry::init_tracing;

/// Everything needed to embed a table server.
pub mod prelude {
    pub use crate::{
        Dispatcher, FdTableError, FdTableServer, FdTableServerBuilder,
        ServerContext, init_tracing,
    };
    pub use fdtable_match::{
        EngineError, EngineLifecycle, GameEngine, Match, MatchConfig,
        MatchError, MatchManager, OccupancyReporter, ReportError,
        RoomLifecycle, Services, TableStatus,
    };
    pub use fdtable_protocol::{
        ClientAck, ClientRequest, Codec, CreateRoomReq, EngineEvent,
        FdResult, GameAck, GameRequest, GameResultUpdate, JsonCodec,
        MatchAck, MatchId, MatchPush, MatchRequest, OccupancyReport, Push,
        RemoteRequest, SessionId, StartClientAck, TableId, Uid,
    };
    pub use fdtable_session::{
        BindingError, BindingStore, GatewayError, LocalGateway,
        MemoryBindingStore, PushReceiver, SessionGateway,
    };
}
