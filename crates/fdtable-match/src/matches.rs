//! A match: one configuration and every live table it owns.
//!
//! Client-facing handlers resolve the acting player from the session,
//! check the registry, find the table and hand the transition to the
//! table's actor. Engine-originated handlers skip the session step.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use fdtable_protocol::{
    CreateRoomReq, FdResult, GameResultUpdate, MatchId, SessionId,
    StartClientAck, TableId, Uid,
};
use rand::Rng;

use crate::table::{TableContext, spawn_table};
use crate::{
    ConfigError, EngineLifecycle, MatchConfig, MatchError, Player,
    RoomLifecycle, Services, TableHandle, TableIdAllocator, TableInfo,
};

/// Builder for a [`Match`] with non-default parts.
///
/// ```rust,ignore
/// let m = Match::builder(config, services)
///     .lifecycle(Arc::new(MyPokerLifecycle::new()))
///     .build()?;
/// ```
pub struct MatchBuilder {
    config: MatchConfig,
    services: Services,
    lifecycle: Option<Arc<dyn RoomLifecycle>>,
    ids: Option<TableIdAllocator>,
}

impl MatchBuilder {
    /// Replaces the engine-backed lifecycle, for game types that need
    /// their own table behaviour.
    pub fn lifecycle(mut self, lifecycle: Arc<dyn RoomLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Replaces the production ID range.
    pub fn id_pool(mut self, ids: TableIdAllocator) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Validates the configuration and builds the match.
    pub fn build(self) -> Result<Match, ConfigError> {
        self.config.validate()?;
        let services = self.services;

        let lifecycle: Arc<dyn RoomLifecycle> = match self.lifecycle {
            Some(lifecycle) => lifecycle,
            None => Arc::new(EngineLifecycle::new(
                Arc::clone(&services.engine),
                self.config.match_id,
                &self.config.game_type,
                services.engine_timeout,
            )),
        };

        let ctx = TableContext {
            config: self.config,
            server_id: services.server_id,
            registry: services.registry,
            ids: self.ids.unwrap_or_default(),
            tables: RwLock::new(HashMap::new()),
            lifecycle,
            gateway: services.gateway,
            bindings: services.bindings,
        };

        Ok(Match {
            ctx: Arc::new(ctx),
            admission: Mutex::new(()),
        })
    }
}

/// One match configuration and its live tables.
pub struct Match {
    ctx: Arc<TableContext>,
    /// Serialises "player not active" checks with the registry insert
    /// that follows them.
    admission: Mutex<()>,
}

impl Match {
    /// A match with the engine-backed lifecycle and production ID range.
    pub fn new(
        config: MatchConfig,
        services: Services,
    ) -> Result<Self, ConfigError> {
        Self::builder(config, services).build()
    }

    pub fn builder(config: MatchConfig, services: Services) -> MatchBuilder {
        MatchBuilder {
            config,
            services,
            lifecycle: None,
            ids: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.ctx.config.match_id
    }

    pub fn config(&self) -> &MatchConfig {
        &self.ctx.config
    }

    pub fn server_id(&self) -> &str {
        &self.ctx.server_id
    }

    /// The allocator this match draws table IDs from.
    pub fn id_pool(&self) -> &TableIdAllocator {
        &self.ctx.ids
    }

    /// Number of live tables.
    pub fn table_count(&self) -> usize {
        self.ctx.table_count()
    }

    /// Handle to a live table, if any.
    pub fn table(&self, table_id: TableId) -> Option<TableHandle> {
        self.ctx.table(table_id)
    }

    pub async fn table_info(
        &self,
        table_id: TableId,
    ) -> Result<TableInfo, MatchError> {
        self.require_table(table_id)?.info().await
    }

    fn admission(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, session: SessionId) -> Result<Uid, MatchError> {
        self.ctx
            .gateway
            .resolve_uid(session)
            .ok_or(MatchError::NotLoggedIn)
    }

    fn require_table(
        &self,
        table_id: TableId,
    ) -> Result<TableHandle, MatchError> {
        self.ctx
            .table(table_id)
            .ok_or(MatchError::TableNotFound(table_id))
    }

    /// The registry entry for `uid`, provided it belongs to this match.
    fn seated_here(&self, uid: &Uid) -> Result<Player, MatchError> {
        self.ctx
            .registry
            .load(uid)
            .filter(|p| p.match_id == self.id())
            .ok_or_else(|| MatchError::NotOnTable(uid.clone()))
    }

    // -----------------------------------------------------------------------
    // Client-originated
    // -----------------------------------------------------------------------

    /// Opens a new table and seats the caller at seat 0.
    ///
    /// On any failure the table ID goes back to the pool and the caller's
    /// registry entry is removed, so nothing is left behind. The table
    /// actor does that cleanup, so it also happens if this future is
    /// dropped before the answer arrives.
    pub async fn handle_create_room(
        &self,
        session: SessionId,
        req: CreateRoomReq,
    ) -> Result<StartClientAck, MatchError> {
        let uid = self.resolve(session)?;

        let table_id = {
            let _guard = self.admission();
            if self.ctx.registry.load(&uid).is_some() {
                return Err(MatchError::AlreadyInMatch(uid));
            }
            let table_id = self.ctx.ids.take()?;
            if let Err(e) = self.ctx.registry.store(
                uid.clone(),
                self.id(),
                table_id,
                self.ctx.config.initial_chips,
            ) {
                self.ctx.ids.put_back(table_id);
                return Err(e);
            }
            table_id
        };

        spawn_table(table_id, Arc::clone(&self.ctx), uid, req)
            .await
            .map_err(|_| MatchError::TableNotFound(table_id))?
    }

    /// Seats the caller at an existing table.
    pub async fn handle_join_room(
        &self,
        session: SessionId,
        table_id: TableId,
    ) -> Result<StartClientAck, MatchError> {
        let uid = self.resolve(session)?;

        if self.ctx.registry.load(&uid).is_some() {
            return Err(MatchError::AlreadyInMatch(uid));
        }
        let handle = self.require_table(table_id)?;

        // The registry entry is written only once the join is sure to reach
        // the actor, which releases it if the join fails.
        let result = handle
            .join(uid.clone(), || {
                let _guard = self.admission();
                if self.ctx.registry.load(&uid).is_some() {
                    return Err(MatchError::AlreadyInMatch(uid.clone()));
                }
                self.ctx
                    .registry
                    .store(
                        uid.clone(),
                        self.id(),
                        table_id,
                        self.ctx.config.initial_chips,
                    )
                    .map(|_| ())
            })
            .await;
        if let Err(e) = &result {
            tracing::debug!(%uid, %table_id, error = %e, "join room failed");
        }
        result
    }

    /// Ends a table the caller is seated at.
    pub async fn handle_cancel_room(
        &self,
        session: SessionId,
        table_id: TableId,
    ) -> Result<TableId, MatchError> {
        let uid = self.resolve(session)?;
        let player = self.seated_here(&uid)?;
        if player.table_id != table_id {
            return Err(MatchError::NotOnTable(uid));
        }
        self.require_table(table_id)?.cancel(uid).await?;
        Ok(table_id)
    }

    /// Takes the caller out of their current table.
    pub async fn handle_exit_match(
        &self,
        session: SessionId,
    ) -> Result<(), MatchError> {
        let uid = self.resolve(session)?;
        let player = self.seated_here(&uid)?;
        self.require_table(player.table_id)?.exit(uid).await
    }

    /// The accumulated result of the caller's current table.
    pub async fn handle_fd_result(
        &self,
        session: SessionId,
    ) -> Result<FdResult, MatchError> {
        let uid = self.resolve(session)?;
        let player = self
            .ctx
            .registry
            .load(&uid)
            .ok_or(MatchError::PlayerNotFound(uid))?;
        self.require_table(player.table_id)?.snapshot().await
    }

    // -----------------------------------------------------------------------
    // Engine/proxy-originated
    // -----------------------------------------------------------------------

    /// A player's connection went up or down.
    pub async fn handle_net_state(
        &self,
        uid: Uid,
        online: bool,
    ) -> Result<(), MatchError> {
        let player = self.seated_here(&uid)?;
        self.require_table(player.table_id)?
            .net_change(uid, online)
            .await
    }

    /// Applies one finished round to its table.
    pub async fn handle_game_result(
        &self,
        update: GameResultUpdate,
    ) -> Result<(), MatchError> {
        self.require_table(update.table_id)?
            .game_result(update)
            .await
    }

    /// Ends a table. The table leaves the map before anything else
    /// happens, so a repeated call finds nothing and fails.
    pub async fn handle_game_over(
        &self,
        table_id: TableId,
    ) -> Result<(), MatchError> {
        let handle = self
            .ctx
            .remove_table(table_id)
            .ok_or(MatchError::TableNotFound(table_id))?;
        tracing::debug!(%table_id, "game over");
        handle.game_over().await
    }

    // -----------------------------------------------------------------------
    // Reporting and shutdown
    // -----------------------------------------------------------------------

    /// Coarse occupancy estimate for lobby listings: full tables for all
    /// but one, and a random fill for the last. Never used for decisions.
    pub fn get_player_count(&self) -> u32 {
        let tables = self.table_count() as u32;
        if tables == 0 {
            return 0;
        }
        let capacity = self.ctx.config.player_per_table;
        (tables - 1) * capacity + rand::rng().random_range(0..capacity)
    }

    /// Stops every table actor. Tables are not torn down: players keep
    /// their registry entries until the process exits.
    pub async fn shutdown(&self) {
        for handle in self.ctx.handles() {
            handle.shutdown().await;
        }
        self.ctx
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
