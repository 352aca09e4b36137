//! Error types for the match layer.

use std::path::PathBuf;
use std::time::Duration;

use fdtable_protocol::{TableId, Uid};
use fdtable_session::BindingError;

/// Errors a match request can fail with.
///
/// All of them are request-scoped: none leaves a table or player behind,
/// and none is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The session has no uid bound to it.
    #[error("session is not logged in")]
    NotLoggedIn,

    /// The player already holds a seat (or a pending seat) somewhere.
    #[error("player {0} is already in a match")]
    AlreadyInMatch(Uid),

    #[error("player {0} not found")]
    PlayerNotFound(Uid),

    /// No live table with this ID in the match.
    #[error("table {0} not found")]
    TableNotFound(TableId),

    #[error("table {0} is full")]
    TableFull(TableId),

    #[error("player {0} already seated at table {1}")]
    AlreadySeated(Uid, TableId),

    /// The player is not seated at the table the request refers to.
    #[error("player {0} is not on the table")]
    NotOnTable(Uid),

    #[error("table id pool exhausted")]
    IdPoolExhausted,

    /// The engine call failed or timed out. Local state was rolled back.
    #[error("game engine unavailable: {0}")]
    EngineUnavailable(#[from] EngineError),

    /// Recording the player's binding failed. The seat was not taken.
    #[error("binding store failed: {0}")]
    BindingFailed(#[from] BindingError),
}

impl MatchError {
    /// Stable numeric code sent to clients in an error ack.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotLoggedIn => 1001,
            Self::AlreadyInMatch(_) => 1002,
            Self::PlayerNotFound(_) => 1003,
            Self::TableNotFound(_) => 1004,
            Self::TableFull(_) => 1005,
            Self::AlreadySeated(..) => 1006,
            Self::NotOnTable(_) => 1007,
            Self::IdPoolExhausted => 1008,
            Self::EngineUnavailable(_) => 1009,
            Self::BindingFailed(_) => 1010,
        }
    }
}

/// Errors from a call to the game engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No answer within the deadline.
    #[error("{route} timed out after {after:?}")]
    Timeout { route: String, after: Duration },

    /// The engine answered with a non-zero code.
    #[error("engine rejected request (code {code}): {message}")]
    Rejected { code: i32, message: String },

    /// The request never reached the engine, or the answer never came
    /// back intact.
    #[error("engine transport failed: {0}")]
    Transport(String),
}

/// Errors from loading match configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config parsed but describes an unusable match.
    #[error("invalid match config: {0}")]
    Invalid(String),
}

/// Errors from forwarding an occupancy report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("occupancy report failed: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_distinct_per_variant() {
        let errors = [
            MatchError::NotLoggedIn,
            MatchError::AlreadyInMatch(Uid::from("a")),
            MatchError::PlayerNotFound(Uid::from("a")),
            MatchError::TableNotFound(TableId(1)),
            MatchError::TableFull(TableId(1)),
            MatchError::AlreadySeated(Uid::from("a"), TableId(1)),
            MatchError::NotOnTable(Uid::from("a")),
            MatchError::IdPoolExhausted,
            MatchError::EngineUnavailable(EngineError::Transport("x".into())),
            MatchError::BindingFailed(BindingError::Unavailable("x".into())),
        ];
        let mut codes: Vec<u16> = errors.iter().map(MatchError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_engine_error_converts_to_engine_unavailable() {
        let err: MatchError = EngineError::Rejected {
            code: 2,
            message: "no table".into(),
        }
        .into();
        assert!(matches!(err, MatchError::EngineUnavailable(_)));
        assert_eq!(err.to_string(), "game engine unavailable: engine rejected request (code 2): no table");
    }
}
