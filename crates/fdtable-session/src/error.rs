//! Error types for the session layer.

use fdtable_protocol::Uid;

/// Errors from delivering pushes or resolving sessions.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Some recipients had no live connection. Delivery is best-effort,
    /// so callers log this and move on.
    #[error("push undelivered to {} player(s)", .0.len())]
    Undelivered(Vec<Uid>),

    /// The gateway itself is gone (shutting down, cluster link lost).
    #[error("session gateway unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the player-binding store.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// The store could not be reached or refused the write.
    #[error("binding store unavailable: {0}")]
    Unavailable(String),
}
