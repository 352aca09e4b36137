//! Table actor: one Tokio task per live table.
//!
//! Every transition of a table (seat a player, apply a round, end the
//! table) is a command on the table's channel, so one table's transitions
//! are serialised without a lock and different tables run in parallel.
//! Engine calls happen inside the actor: a slow engine stalls its own
//! table and nothing else.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use fdtable_protocol::{
    AddTableReq, CancelReason, CreateRoomReq, FdResult, GameResultUpdate,
    MatchPush, PropertyMap, Push, RoundRecord, RoundResult, StartClientAck,
    TableId, Uid,
};
use fdtable_session::{BindingStore, SessionGateway};
use tokio::sync::{mpsc, oneshot};

use crate::{
    MATCH_TYPE, MatchConfig, MatchError, PlayerRegistry, RoomLifecycle,
    TableIdAllocator, TableStatus,
};

/// Command channel depth per table.
const CHANNEL_SIZE: usize = 64;

/// State shared by a match and all of its table actors.
pub(crate) struct TableContext {
    pub(crate) config: MatchConfig,
    pub(crate) server_id: String,
    pub(crate) registry: Arc<PlayerRegistry>,
    pub(crate) ids: TableIdAllocator,
    pub(crate) tables: RwLock<HashMap<TableId, TableHandle>>,
    pub(crate) lifecycle: Arc<dyn RoomLifecycle>,
    pub(crate) gateway: Arc<dyn SessionGateway>,
    pub(crate) bindings: Arc<dyn BindingStore>,
}

impl TableContext {
    pub(crate) fn table(&self, table_id: TableId) -> Option<TableHandle> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table_id)
            .cloned()
    }

    pub(crate) fn insert_table(&self, handle: TableHandle) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.table_id, handle);
    }

    pub(crate) fn remove_table(&self, table_id: TableId) -> Option<TableHandle> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&table_id)
    }

    pub(crate) fn table_count(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn handles(&self) -> Vec<TableHandle> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

type Reply<T> = oneshot::Sender<Result<T, MatchError>>;

/// Commands sent to a table actor through its channel.
pub(crate) enum TableCommand {
    Join {
        uid: Uid,
        reply: Reply<StartClientAck>,
    },
    Exit {
        uid: Uid,
        reply: Reply<()>,
    },
    Cancel {
        uid: Uid,
        reply: Reply<()>,
    },
    NetChange {
        uid: Uid,
        online: bool,
        reply: Reply<()>,
    },
    GameResult {
        update: GameResultUpdate,
        reply: oneshot::Sender<()>,
    },
    GameOver {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<FdResult>,
    },
    Info {
        reply: oneshot::Sender<TableInfo>,
    },
    Shutdown,
}

/// One occupied seat as seen from outside the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatInfo {
    pub seat: u32,
    pub uid: Uid,
    pub online: bool,
}

/// A snapshot of table metadata.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub table_id: TableId,
    pub status: TableStatus,
    pub capacity: u32,
    /// Occupied seats in seat order.
    pub seats: Vec<SeatInfo>,
}

impl TableInfo {
    pub fn player_count(&self) -> usize {
        self.seats.len()
    }
}

/// Handle to a running table actor. Cheap to clone.
#[derive(Clone)]
pub struct TableHandle {
    table_id: TableId,
    sender: mpsc::Sender<TableCommand>,
}

impl TableHandle {
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Sends a command built around a fresh reply channel and waits for
    /// the answer. A closed channel means the table has ended.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> TableCommand,
    ) -> Result<T, MatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| MatchError::TableNotFound(self.table_id))?;
        reply_rx
            .await
            .map_err(|_| MatchError::TableNotFound(self.table_id))
    }

    /// Queues a join for `uid`.
    ///
    /// `admit` runs once a channel slot is held and before the command is
    /// sent, with no await in between. Whatever `admit` records is then
    /// always seen by the actor, even if the caller stops waiting.
    pub(crate) async fn join(
        &self,
        uid: Uid,
        admit: impl FnOnce() -> Result<(), MatchError>,
    ) -> Result<StartClientAck, MatchError> {
        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| MatchError::TableNotFound(self.table_id))?;
        admit()?;
        let (reply, answer) = oneshot::channel();
        permit.send(TableCommand::Join { uid, reply });
        answer
            .await
            .map_err(|_| MatchError::TableNotFound(self.table_id))?
    }

    pub(crate) async fn exit(&self, uid: Uid) -> Result<(), MatchError> {
        self.request(|reply| TableCommand::Exit { uid, reply }).await?
    }

    pub(crate) async fn cancel(&self, uid: Uid) -> Result<(), MatchError> {
        self.request(|reply| TableCommand::Cancel { uid, reply }).await?
    }

    pub(crate) async fn net_change(
        &self,
        uid: Uid,
        online: bool,
    ) -> Result<(), MatchError> {
        self.request(|reply| TableCommand::NetChange { uid, online, reply })
            .await?
    }

    pub(crate) async fn game_result(
        &self,
        update: GameResultUpdate,
    ) -> Result<(), MatchError> {
        self.request(|reply| TableCommand::GameResult { update, reply })
            .await
    }

    pub(crate) async fn game_over(&self) -> Result<(), MatchError> {
        self.request(|reply| TableCommand::GameOver { reply }).await
    }

    /// The table's accumulated result so far.
    pub async fn snapshot(&self) -> Result<FdResult, MatchError> {
        self.request(|reply| TableCommand::Snapshot { reply }).await
    }

    pub async fn info(&self) -> Result<TableInfo, MatchError> {
        self.request(|reply| TableCommand::Info { reply }).await
    }

    /// Stops the actor without tearing the table down.
    pub(crate) async fn shutdown(&self) {
        let _ = self.sender.send(TableCommand::Shutdown).await;
    }
}

struct Seat {
    uid: Uid,
    online: bool,
}

/// The internal table actor state. Runs inside a Tokio task.
struct TableActor {
    table_id: TableId,
    status: TableStatus,
    /// One slot per seat; `None` is a free seat.
    seats: Vec<Option<Seat>>,
    properties: PropertyMap,
    result: FdResult,
    ctx: Arc<TableContext>,
    receiver: mpsc::Receiver<TableCommand>,
}

impl TableActor {
    /// Creates the table, then runs the actor loop until the table ends or
    /// is shut down.
    ///
    /// The create outcome is settled here rather than by the requester: on
    /// success the table enters the match's map, on failure the creator's
    /// registry entry and the table ID are released.
    async fn run(
        mut self,
        handle: TableHandle,
        creator: Uid,
        req: CreateRoomReq,
        reply: Reply<StartClientAck>,
    ) {
        tracing::debug!(table_id = %self.table_id, "table actor started");

        let created = self.create(creator.clone(), req).await;
        match &created {
            Ok(_) => self.ctx.insert_table(handle),
            Err(e) => {
                tracing::warn!(table_id = %self.table_id, %creator, error = %e, "create room failed");
                self.ctx.registry.delete(&creator);
                self.ctx.ids.put_back(self.table_id);
                self.status = TableStatus::Ended;
                drop(handle);
            }
        }
        let _ = reply.send(created);

        while !self.status.is_ended() {
            let Some(cmd) = self.receiver.recv().await else {
                break;
            };
            match cmd {
                TableCommand::Join { uid, reply } => {
                    let result = self.add_player(uid.clone()).await;
                    if result.is_err() {
                        self.release_unseated(&uid);
                    }
                    let _ = reply.send(result);
                }
                TableCommand::Exit { uid, reply } => {
                    let result = self.remove_player(uid).await;
                    let _ = reply.send(result);
                }
                TableCommand::Cancel { uid, reply } => {
                    let result = self.cancel(uid).await;
                    let _ = reply.send(result);
                }
                TableCommand::NetChange { uid, online, reply } => {
                    let result = self.net_change(uid, online).await;
                    let _ = reply.send(result);
                }
                TableCommand::GameResult { update, reply } => {
                    self.game_result(update).await;
                    let _ = reply.send(());
                }
                TableCommand::GameOver { reply } => {
                    self.teardown().await;
                    let _ = reply.send(());
                }
                TableCommand::Snapshot { reply } => {
                    let _ = reply.send(self.result.clone());
                }
                TableCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                TableCommand::Shutdown => break,
            }
        }

        self.drain().await;
        tracing::debug!(table_id = %self.table_id, "table actor stopped");
    }

    /// Refuses everything still queued once the actor stops. A queued join
    /// already holds a registry entry, which is released here.
    async fn drain(&mut self) {
        self.receiver.close();
        while let Some(cmd) = self.receiver.recv().await {
            if let TableCommand::Join { uid, reply } = cmd {
                self.release_unseated(&uid);
                let _ = reply.send(Err(MatchError::TableNotFound(self.table_id)));
            }
        }
    }

    /// Drops the registry entry a join left for `uid`, unless the player
    /// holds a seat.
    fn release_unseated(&self, uid: &Uid) {
        let table_id = self.table_id;
        if self
            .ctx
            .registry
            .delete_if(uid, |p| p.table_id == table_id && p.seat.is_none())
            .is_some()
        {
            tracing::debug!(%table_id, %uid, "released unseated player");
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    async fn create(
        &mut self,
        creator: Uid,
        req: CreateRoomReq,
    ) -> Result<StartClientAck, MatchError> {
        self.result.owner = Some(creator.clone());
        self.result.desn = req.desn.clone();
        self.result.game_count = req.game_count;
        self.properties = req.properties.clone();

        let config = &self.ctx.config;
        let add = AddTableReq {
            property: config.property.clone(),
            score_base: config.score_base,
            match_type: MATCH_TYPE.to_string(),
            game_count: req.game_count,
            player_count: config.player_per_table,
            creator: creator.clone(),
            desn: req.desn,
            fdproperty: req.properties,
        };
        if let Err(e) = self.ctx.lifecycle.create_table(self.table_id, add).await
        {
            tracing::error!(table_id = %self.table_id, error = %e, "engine refused table");
            return Err(e.into());
        }
        self.advance(TableStatus::Playing);

        match self.add_player(creator).await {
            Ok(ack) => {
                tracing::info!(
                    table_id = %self.table_id,
                    match_id = %self.ctx.config.match_id,
                    "table created"
                );
                Ok(ack)
            }
            Err(e) => {
                // The engine already holds a table for this ID.
                if let Err(cancel) = self
                    .ctx
                    .lifecycle
                    .cancel_table(self.table_id, CancelReason::Cancelled)
                    .await
                {
                    tracing::warn!(table_id = %self.table_id, error = %cancel, "engine cancel after failed create");
                }
                Err(e)
            }
        }
    }

    /// Seats `uid` in the lowest free seat. Nothing changes unless the
    /// binding write and the engine call both succeed.
    async fn add_player(
        &mut self,
        uid: Uid,
    ) -> Result<StartClientAck, MatchError> {
        let seat = self
            .seats
            .iter()
            .position(Option::is_none)
            .ok_or(MatchError::TableFull(self.table_id))?;
        if self.seat_of(&uid).is_some() {
            return Err(MatchError::AlreadySeated(uid, self.table_id));
        }
        let seat_no = seat as u32;

        self.ctx
            .bindings
            .put(&uid, self.ctx.config.match_id)
            .await?;

        let score = self
            .ctx
            .registry
            .load(&uid)
            .map_or(self.ctx.config.initial_chips, |p| p.score);
        if let Err(e) = self
            .ctx
            .lifecycle
            .add_player(self.table_id, &uid, seat_no, score)
            .await
        {
            tracing::error!(table_id = %self.table_id, %uid, error = %e, "engine refused player");
            self.remove_binding(&uid).await;
            return Err(e.into());
        }

        self.seats[seat] = Some(Seat {
            uid: uid.clone(),
            online: true,
        });
        self.ctx.registry.update(&uid, |p| {
            p.seat = Some(seat_no);
            p.online = true;
        });

        tracing::info!(
            table_id = %self.table_id,
            %uid,
            seat = seat_no,
            players = self.occupied(),
            "player seated"
        );
        Ok(self.start_ack())
    }

    async fn remove_player(&mut self, uid: Uid) -> Result<(), MatchError> {
        let seat = self
            .seat_of(&uid)
            .ok_or_else(|| MatchError::NotOnTable(uid.clone()))?;

        if let Err(e) = self.ctx.lifecycle.exit_table(self.table_id, &uid).await
        {
            tracing::error!(table_id = %self.table_id, %uid, error = %e, "engine refused exit");
            return Err(e.into());
        }

        if self.occupied() == 1 {
            tracing::info!(table_id = %self.table_id, %uid, "last player left");
            if let Err(e) = self
                .ctx
                .lifecycle
                .cancel_table(self.table_id, CancelReason::Abandoned)
                .await
            {
                tracing::warn!(table_id = %self.table_id, error = %e, "engine cancel of abandoned table");
            }
            self.teardown().await;
            return Ok(());
        }

        self.seats[seat] = None;
        self.ctx.registry.delete(&uid);
        self.remove_binding(&uid).await;
        tracing::info!(
            table_id = %self.table_id,
            %uid,
            players = self.occupied(),
            "player left"
        );
        Ok(())
    }

    /// Ends the table whatever the engine says; an engine failure is still
    /// reported to the caller afterwards.
    async fn cancel(&mut self, uid: Uid) -> Result<(), MatchError> {
        if self.seat_of(&uid).is_none() {
            return Err(MatchError::NotOnTable(uid));
        }

        let engine = self
            .ctx
            .lifecycle
            .cancel_table(self.table_id, CancelReason::Cancelled)
            .await;
        tracing::info!(table_id = %self.table_id, %uid, "table cancelled");
        self.teardown().await;

        engine.map_err(|e| {
            tracing::error!(table_id = %self.table_id, error = %e, "engine cancel failed");
            e.into()
        })
    }

    async fn net_change(
        &mut self,
        uid: Uid,
        online: bool,
    ) -> Result<(), MatchError> {
        let seat = self
            .seat_of(&uid)
            .ok_or_else(|| MatchError::NotOnTable(uid.clone()))?;
        if self.seats[seat].as_ref().is_some_and(|s| s.online == online) {
            return Ok(());
        }

        self.ctx
            .lifecycle
            .net_state(self.table_id, &uid, online)
            .await?;

        if let Some(s) = self.seats[seat].as_mut() {
            s.online = online;
        }
        self.ctx.registry.update(&uid, |p| p.online = online);
        tracing::info!(table_id = %self.table_id, %uid, online, "net state changed");

        if online {
            let ack = self.start_ack();
            self.push(&[uid], Push::StartClient(ack)).await;
        }
        Ok(())
    }

    /// Adds the round's deltas to the accumulated scores and tells every
    /// seated player.
    async fn game_result(&mut self, update: GameResultUpdate) {
        let mut deltas = BTreeMap::new();
        for (uid, delta) in update.scores {
            if self.seat_of(&uid).is_none() {
                tracing::warn!(table_id = %self.table_id, %uid, "round result for unseated player");
                continue;
            }
            *self.result.scores.entry(uid.clone()).or_insert(0) += delta;
            self.ctx.registry.update(&uid, |p| p.score += delta);
            deltas.insert(uid, delta);
        }
        self.result.player_data = update.player_data;
        self.result.rounds.push(RoundRecord {
            game_count: update.cur_game_count,
            deltas: deltas.clone(),
            data: update.round_data.clone(),
        });

        let push = Push::RoundResult(RoundResult {
            table_id: self.table_id,
            cur_game_count: update.cur_game_count,
            deltas,
            scores: self.result.scores.clone(),
            player_data: self.result.player_data.clone(),
            round_data: update.round_data,
        });
        let uids = self.seated_uids();
        self.push(&uids, push).await;
        tracing::debug!(table_id = %self.table_id, round = update.cur_game_count, "round applied");
    }

    /// Ends the table: final push, release every player, return the ID.
    /// Runs at most once.
    async fn teardown(&mut self) {
        if !self.status.can_transition_to(TableStatus::Ended) {
            return;
        }
        self.status = TableStatus::Ended;
        self.ctx.remove_table(self.table_id);

        let uids = self.seated_uids();
        self.push(&uids, Push::MatchResult(self.result.clone())).await;

        for uid in &uids {
            self.ctx.registry.delete(uid);
            self.remove_binding(uid).await;
        }
        self.seats.iter_mut().for_each(|s| *s = None);
        self.ctx.ids.put_back(self.table_id);

        tracing::info!(
            table_id = %self.table_id,
            match_id = %self.ctx.config.match_id,
            players = uids.len(),
            "table ended"
        );
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn advance(&mut self, target: TableStatus) {
        if self.status.can_transition_to(target) {
            self.status = target;
        }
    }

    fn seat_of(&self, uid: &Uid) -> Option<usize> {
        self.seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| &s.uid == uid))
    }

    fn occupied(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    fn seated_uids(&self) -> Vec<Uid> {
        self.seats.iter().flatten().map(|s| s.uid.clone()).collect()
    }

    fn start_ack(&self) -> StartClientAck {
        StartClientAck {
            match_type: MATCH_TYPE.to_string(),
            game_type: self.ctx.config.game_type.clone(),
            server_id: self.ctx.server_id.clone(),
            match_id: self.ctx.config.match_id,
            table_id: self.table_id,
            desn: self.result.desn.clone(),
            properties: self.properties.clone(),
        }
    }

    fn info(&self) -> TableInfo {
        let seats = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                s.as_ref().map(|s| SeatInfo {
                    seat: i as u32,
                    uid: s.uid.clone(),
                    online: s.online,
                })
            })
            .collect();
        TableInfo {
            table_id: self.table_id,
            status: self.status,
            capacity: self.ctx.config.player_per_table,
            seats,
        }
    }

    /// Best-effort delivery; failures are logged only.
    async fn push(&self, uids: &[Uid], push: Push) {
        if uids.is_empty() {
            return;
        }
        let msg = MatchPush {
            server_id: self.ctx.server_id.clone(),
            match_id: self.ctx.config.match_id,
            push,
        };
        if let Err(e) = self.ctx.gateway.push(uids, &msg).await {
            tracing::warn!(table_id = %self.table_id, error = %e, "push failed");
        }
    }

    async fn remove_binding(&self, uid: &Uid) {
        if let Err(e) = self.ctx.bindings.remove(uid).await {
            tracing::warn!(table_id = %self.table_id, %uid, error = %e, "binding removal failed");
        }
    }
}

/// Spawns a table actor that creates the table for `creator`.
///
/// The returned receiver yields the create outcome. The actor settles
/// that outcome whether or not anyone is still listening.
pub(crate) fn spawn_table(
    table_id: TableId,
    ctx: Arc<TableContext>,
    creator: Uid,
    req: CreateRoomReq,
) -> oneshot::Receiver<Result<StartClientAck, MatchError>> {
    let (tx, rx) = mpsc::channel(CHANNEL_SIZE);
    let capacity = ctx.config.player_per_table as usize;

    let actor = TableActor {
        table_id,
        status: TableStatus::Waiting,
        seats: (0..capacity).map(|_| None).collect(),
        properties: PropertyMap::new(),
        result: FdResult::new(table_id),
        ctx,
        receiver: rx,
    };

    let handle = TableHandle {
        table_id,
        sender: tx,
    };
    let (reply, created) = oneshot::channel();
    tokio::spawn(actor.run(handle, creator, req, reply));
    created
}
