//! Table lifecycle and match management for fdtable.
//!
//! Each live table runs as an isolated Tokio task (actor model) that owns
//! its seats and accumulated result and talks to the game engine.
//!
//! # Key types
//!
//! - [`TableIdAllocator`]: shuffled, recyclable five-digit table IDs
//! - [`PlayerRegistry`]: one active match per player, node-wide
//! - [`TableHandle`]: send commands to a running table actor
//! - [`TableStatus`]: table lifecycle state machine
//! - [`Match`]: one configuration and its tables; the request handlers
//! - [`MatchManager`]: every match on the node, plus occupancy reporting
//! - [`GameEngine`] / [`RoomLifecycle`]: the engine seams

mod config;
mod error;
mod ids;
mod lifecycle;
mod manager;
mod matches;
mod player;
mod services;
mod table;

pub use config::{MATCH_TYPE, MatchConfig, TableStatus};
pub use error::{ConfigError, EngineError, MatchError, ReportError};
pub use ids::{MAX_TABLE_ID, MIN_TABLE_ID, TableIdAllocator};
pub use lifecycle::{EngineLifecycle, GameEngine, RoomLifecycle, route_for};
pub use manager::{MatchManager, OccupancyReporter};
pub use matches::{Match, MatchBuilder};
pub use player::{Player, PlayerRegistry};
pub use services::{DEFAULT_ENGINE_TIMEOUT, Services};
pub use table::{SeatInfo, TableHandle, TableInfo};
