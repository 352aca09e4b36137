//! The session gateway: who is behind a session, and how to reach them.
//!
//! The transport layer binds a uid to a session after login. Handlers
//! only ever see a [`SessionId`]; they ask the gateway for the uid and
//! fail with "not logged in" when there is none. Pushes go out the same
//! way, addressed by uid.
//!
//! # Concurrency note
//!
//! [`LocalGateway`] keeps its maps behind one `std::sync::Mutex`. Every
//! critical section is a couple of map operations and never awaits, so a
//! blocking mutex is cheaper than an async one here.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fdtable_protocol::{MatchPush, SessionId, Uid};
use tokio::sync::mpsc;

use crate::GatewayError;

/// Receiving end of a player's push channel.
pub type PushReceiver = mpsc::UnboundedReceiver<MatchPush>;

/// Resolves sessions to players and delivers pushes to players.
#[async_trait]
pub trait SessionGateway: Send + Sync + 'static {
    /// Returns the uid bound to `session`, or `None` if the session never
    /// logged in (or already logged out).
    fn resolve_uid(&self, session: SessionId) -> Option<Uid>;

    /// Delivers `push` to every uid in `uids`.
    ///
    /// Best-effort: an `Err` means some recipients were missed, never that
    /// the caller's operation should be undone.
    async fn push(
        &self,
        uids: &[Uid],
        push: &MatchPush,
    ) -> Result<(), GatewayError>;
}

#[derive(Default)]
struct Bindings {
    /// Session → uid, written at login.
    sessions: HashMap<SessionId, Uid>,
    /// Reverse index so a re-login can evict the stale session.
    by_uid: HashMap<Uid, SessionId>,
    /// Per-uid outbound channel, created on `subscribe`.
    outboxes: HashMap<Uid, mpsc::UnboundedSender<MatchPush>>,
}

/// In-process [`SessionGateway`].
///
/// ## Lifecycle
///
/// ```text
/// bind(session, uid) ──→ subscribe(uid) ──→ push(..) ──→ unbind(session)
/// ```
///
/// A uid has at most one bound session. Binding it again (a reconnect
/// from a new socket) evicts the old session; the outbox is kept so a
/// client listening on it keeps receiving.
#[derive(Default)]
pub struct LocalGateway {
    inner: Mutex<Bindings>,
}

impl LocalGateway {
    /// Creates an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Bindings> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `uid` to `session`. Returns the session it replaced, if any.
    pub fn bind(&self, session: SessionId, uid: Uid) -> Option<SessionId> {
        let mut inner = self.lock();

        if let Some(old_uid) = inner.sessions.remove(&session) {
            inner.by_uid.remove(&old_uid);
        }
        let replaced = inner.by_uid.insert(uid.clone(), session);
        if let Some(old) = replaced {
            inner.sessions.remove(&old);
            tracing::info!(%uid, %old, %session, "session replaced");
        }
        inner.sessions.insert(session, uid.clone());

        tracing::info!(%uid, %session, "session bound");
        replaced
    }

    /// Drops the binding for `session`. Returns the uid it was bound to.
    pub fn unbind(&self, session: SessionId) -> Option<Uid> {
        let mut inner = self.lock();
        let uid = inner.sessions.remove(&session)?;
        inner.by_uid.remove(&uid);
        tracing::info!(%uid, %session, "session unbound");
        Some(uid)
    }

    /// Opens (or reopens) the push channel for `uid`.
    ///
    /// Any earlier receiver for the same uid stops receiving.
    pub fn subscribe(&self, uid: Uid) -> PushReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().outboxes.insert(uid, tx);
        rx
    }

    /// Returns the session currently bound to `uid`.
    pub fn session_of(&self, uid: &Uid) -> Option<SessionId> {
        self.lock().by_uid.get(uid).copied()
    }

    /// Number of bound sessions.
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Returns `true` if no session is bound.
    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }
}

#[async_trait]
impl SessionGateway for LocalGateway {
    fn resolve_uid(&self, session: SessionId) -> Option<Uid> {
        self.lock().sessions.get(&session).cloned()
    }

    async fn push(
        &self,
        uids: &[Uid],
        push: &MatchPush,
    ) -> Result<(), GatewayError> {
        let mut missed = Vec::new();
        {
            let mut inner = self.lock();
            for uid in uids {
                let delivered = inner
                    .outboxes
                    .get(uid)
                    .is_some_and(|tx| tx.send(push.clone()).is_ok());
                if !delivered {
                    // Receiver dropped: forget the dead channel.
                    inner.outboxes.remove(uid);
                    missed.push(uid.clone());
                }
            }
        }

        if missed.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Undelivered(missed))
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
