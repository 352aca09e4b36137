//! Request routing: typed envelopes in, typed acks out.
//!
//! The transport layer hands over one decoded (or raw) client request
//! per call together with the session it arrived on. The dispatcher finds
//! the match by ID, routes the tagged payload to the matching handler and
//! always answers: a failed request becomes an error ack, never a dropped
//! message. Engine and proxy events come in through
//! [`Dispatcher::handle_remote`] and have no answer.

use std::sync::Arc;

use fdtable_match::Match;
use fdtable_protocol::{
    ClientAck, ClientRequest, Codec, EngineEvent, JsonCodec, MatchAck,
    MatchId, MatchRequest, RemoteRequest, SessionId,
};

use crate::{FdTableError, ServerContext};

/// Routes client and engine messages to matches. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher<C: Codec = JsonCodec> {
    ctx: Arc<ServerContext>,
    codec: C,
}

impl Dispatcher<JsonCodec> {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self::with_codec(ctx, JsonCodec)
    }
}

impl<C: Codec> Dispatcher<C> {
    pub fn with_codec(ctx: Arc<ServerContext>, codec: C) -> Self {
        Self { ctx, codec }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    fn find(&self, match_id: MatchId) -> Result<Arc<Match>, FdTableError> {
        self.ctx
            .matches()
            .get(match_id)
            .ok_or(FdTableError::MatchNotFound(match_id))
    }

    fn wrap(&self, match_id: MatchId, ack: ClientAck) -> MatchAck {
        MatchAck {
            server_id: self.ctx.server_id().to_string(),
            match_id,
            ack,
        }
    }

    fn error_ack(match_id: MatchId, e: &FdTableError) -> ClientAck {
        if !matches!(e, FdTableError::Match(_) | FdTableError::MatchNotFound(_)) {
            tracing::warn!(%match_id, error = %e, "request failed outside match handling");
        }
        ClientAck::Error {
            code: e.code(),
            message: e.to_string(),
        }
    }

    /// Handles one client request. Always produces an answer.
    pub async fn handle_client(
        &self,
        session: SessionId,
        request: MatchRequest,
    ) -> MatchAck {
        let match_id = request.match_id;
        let ack = match self.route(session, request).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::debug!(%session, %match_id, error = %e, "request failed");
                Self::error_ack(match_id, &e)
            }
        };
        self.wrap(match_id, ack)
    }

    async fn route(
        &self,
        session: SessionId,
        request: MatchRequest,
    ) -> Result<ClientAck, FdTableError> {
        let m = self.find(request.match_id)?;
        tracing::debug!(%session, match_id = %request.match_id, req = ?request.req, "client request");

        let ack = match request.req {
            ClientRequest::CreateRoom(req) => {
                ClientAck::StartClient(m.handle_create_room(session, req).await?)
            }
            ClientRequest::JoinRoom { table_id } => ClientAck::StartClient(
                m.handle_join_room(session, table_id).await?,
            ),
            ClientRequest::CancelRoom { table_id } => ClientAck::CancelRoom {
                table_id: m.handle_cancel_room(session, table_id).await?,
            },
            ClientRequest::ExitMatch => {
                m.handle_exit_match(session).await?;
                ClientAck::ExitMatch
            }
            ClientRequest::FdResult => {
                ClientAck::FdResult(m.handle_fd_result(session).await?)
            }
        };
        Ok(ack)
    }

    /// Decodes a client request, handles it and encodes the answer.
    ///
    /// An undecodable request still gets an error ack, addressed to
    /// match 0 since its match is unknown.
    ///
    /// # Errors
    /// Only if the answer itself cannot be encoded.
    pub async fn handle_client_bytes(
        &self,
        session: SessionId,
        data: &[u8],
    ) -> Result<Vec<u8>, FdTableError> {
        let ack = match self.codec.decode::<MatchRequest>(data) {
            Ok(request) => self.handle_client(session, request).await,
            Err(e) => {
                tracing::debug!(%session, error = %e, "failed to decode request");
                let e = FdTableError::from(e);
                self.wrap(MatchId(0), Self::error_ack(MatchId(0), &e))
            }
        };
        Ok(self.codec.encode(&ack)?)
    }

    /// Handles one engine- or proxy-originated event.
    pub async fn handle_remote(
        &self,
        request: RemoteRequest,
    ) -> Result<(), FdTableError> {
        let m = self.find(request.match_id)?;
        let result = match request.event {
            EngineEvent::NetState { uid, online } => {
                m.handle_net_state(uid, online).await
            }
            EngineEvent::GameResult(update) => m.handle_game_result(update).await,
            EngineEvent::GameOver { table_id } => {
                m.handle_game_over(table_id).await
            }
        };
        if let Err(e) = &result {
            tracing::warn!(match_id = %request.match_id, error = %e, "remote event failed");
        }
        Ok(result?)
    }

    /// Decodes and handles one engine- or proxy-originated event.
    pub async fn handle_remote_bytes(
        &self,
        data: &[u8],
    ) -> Result<(), FdTableError> {
        let request: RemoteRequest = self.codec.decode(data)?;
        self.handle_remote(request).await
    }
}
