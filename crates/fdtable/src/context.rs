//! The explicit server context handed to every handler.

use std::sync::Arc;

use fdtable_match::{MatchManager, PlayerRegistry};

/// Everything a request handler may touch, built once at startup.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. There is
/// no process-global state: two contexts in one process (two test
/// servers, say) never see each other's matches or players.
pub struct ServerContext {
    server_id: String,
    matches: Arc<MatchManager>,
}

impl ServerContext {
    pub fn new(matches: Arc<MatchManager>) -> Self {
        Self {
            server_id: matches.services().server_id.clone(),
            matches,
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn matches(&self) -> &Arc<MatchManager> {
        &self.matches
    }

    /// The node-wide player registry.
    pub fn registry(&self) -> &Arc<PlayerRegistry> {
        &self.matches.services().registry
    }
}
