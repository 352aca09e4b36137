//! Unified error type for the fdtable server.

use fdtable_match::{ConfigError, MatchError};
use fdtable_protocol::{MatchId, ProtocolError};

/// Top-level error for the dispatcher and the server builder.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum FdTableError {
    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A match-level error (the request's own failure).
    #[error(transparent)]
    Match(#[from] MatchError),

    /// A match configuration could not be loaded or was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request named a match this node does not serve.
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
}

impl FdTableError {
    /// Numeric code for an error ack. Match errors keep their own codes.
    pub fn code(&self) -> u16 {
        match self {
            Self::Match(e) => e.code(),
            Self::Protocol(_) => 1000,
            Self::MatchNotFound(_) => 1011,
            Self::Config(_) => 1099,
        }
    }
}
