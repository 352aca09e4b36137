//! The shared collaborators every match runs against.

use std::sync::Arc;
use std::time::Duration;

use fdtable_session::{BindingStore, SessionGateway};

use crate::{GameEngine, PlayerRegistry};

/// Default deadline for one engine call.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a [`Match`](crate::Match) needs from outside itself.
///
/// Built once at startup and cloned into each match. The player registry
/// lives here because the one-match-per-player rule spans every match on
/// the node.
#[derive(Clone)]
pub struct Services {
    pub server_id: String,
    pub registry: Arc<PlayerRegistry>,
    pub engine: Arc<dyn GameEngine>,
    pub gateway: Arc<dyn SessionGateway>,
    pub bindings: Arc<dyn BindingStore>,
    pub engine_timeout: Duration,
}

impl Services {
    /// Bundles the collaborators with a fresh registry and the default
    /// engine timeout.
    pub fn new(
        server_id: impl Into<String>,
        engine: Arc<dyn GameEngine>,
        gateway: Arc<dyn SessionGateway>,
        bindings: Arc<dyn BindingStore>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            registry: Arc::new(PlayerRegistry::new()),
            engine,
            gateway,
            bindings,
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }

    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }
}
