//! The game-engine seams.
//!
//! [`GameEngine`] is the raw RPC: one request on one route, one answer.
//! [`RoomLifecycle`] is what a table actually needs from an engine:
//! open a table, seat a player, and so on. The generic table code only
//! ever talks to a `RoomLifecycle`; [`EngineLifecycle`] implements it on
//! top of any `GameEngine`, and a game type with special needs can supply
//! its own implementation instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fdtable_protocol::{
    AddTableReq, CancelReason, EngineRequest, GameAck, GameRequest, MatchId,
    TableId, Uid,
};

use crate::EngineError;

/// Request/response RPC to the game-logic process.
#[async_trait]
pub trait GameEngine: Send + Sync + 'static {
    /// Sends `req` on `route` and waits for the answer. Implementations
    /// need not enforce a deadline; [`EngineLifecycle`] does.
    async fn call(
        &self,
        route: &str,
        req: GameRequest,
    ) -> Result<GameAck, EngineError>;
}

/// Table-level engine capabilities used by the table actor.
#[async_trait]
pub trait RoomLifecycle: Send + Sync + 'static {
    async fn create_table(
        &self,
        table_id: TableId,
        req: AddTableReq,
    ) -> Result<(), EngineError>;

    async fn add_player(
        &self,
        table_id: TableId,
        uid: &Uid,
        seat: u32,
        score: i64,
    ) -> Result<(), EngineError>;

    async fn cancel_table(
        &self,
        table_id: TableId,
        reason: CancelReason,
    ) -> Result<(), EngineError>;

    async fn exit_table(
        &self,
        table_id: TableId,
        uid: &Uid,
    ) -> Result<(), EngineError>;

    async fn net_state(
        &self,
        table_id: TableId,
        uid: &Uid,
        online: bool,
    ) -> Result<(), EngineError>;
}

/// [`RoomLifecycle`] over a [`GameEngine`], one per match.
///
/// Every call is wrapped in a [`GameRequest`] addressed to
/// `"<game_type>.remote.message"` and bounded by `timeout`. A non-zero
/// [`GameAck`] code becomes [`EngineError::Rejected`].
pub struct EngineLifecycle {
    engine: Arc<dyn GameEngine>,
    match_id: MatchId,
    route: String,
    timeout: Duration,
}

impl EngineLifecycle {
    pub fn new(
        engine: Arc<dyn GameEngine>,
        match_id: MatchId,
        game_type: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            match_id,
            route: route_for(game_type),
            timeout,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    async fn send(
        &self,
        table_id: TableId,
        req: EngineRequest,
    ) -> Result<(), EngineError> {
        let kind = req.kind();
        let request = GameRequest {
            match_id: self.match_id,
            table_id,
            req,
        };
        tracing::debug!(route = %self.route, %table_id, kind, "engine call");

        let ack = tokio::time::timeout(
            self.timeout,
            self.engine.call(&self.route, request),
        )
        .await
        .map_err(|_| EngineError::Timeout {
            route: self.route.clone(),
            after: self.timeout,
        })??;

        if ack.is_ok() {
            Ok(())
        } else {
            Err(EngineError::Rejected {
                code: ack.code,
                message: ack.message,
            })
        }
    }
}

/// The engine route a game type listens on.
pub fn route_for(game_type: &str) -> String {
    format!("{game_type}.remote.message")
}

#[async_trait]
impl RoomLifecycle for EngineLifecycle {
    async fn create_table(
        &self,
        table_id: TableId,
        req: AddTableReq,
    ) -> Result<(), EngineError> {
        self.send(table_id, EngineRequest::AddTable(req)).await
    }

    async fn add_player(
        &self,
        table_id: TableId,
        uid: &Uid,
        seat: u32,
        score: i64,
    ) -> Result<(), EngineError> {
        let req = EngineRequest::AddPlayer {
            uid: uid.clone(),
            seat,
            score,
        };
        self.send(table_id, req).await
    }

    async fn cancel_table(
        &self,
        table_id: TableId,
        reason: CancelReason,
    ) -> Result<(), EngineError> {
        self.send(table_id, EngineRequest::CancelTable { reason }).await
    }

    async fn exit_table(
        &self,
        table_id: TableId,
        uid: &Uid,
    ) -> Result<(), EngineError> {
        let req = EngineRequest::ExitTable { uid: uid.clone() };
        self.send(table_id, req).await
    }

    async fn net_state(
        &self,
        table_id: TableId,
        uid: &Uid,
        online: bool,
    ) -> Result<(), EngineError> {
        let req = EngineRequest::NetState {
            uid: uid.clone(),
            online,
        };
        self.send(table_id, req).await
    }
}
