//! Byte encoding for everything in this crate.
//!
//! The dispatcher and the transport agree on a [`Codec`]; nothing else in
//! the server cares which one. [`JsonCodec`] is the only implementation
//! today because the client SDK and the engine both speak JSON.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back into values.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// request task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] for an empty buffer,
    /// [`ProtocolError::Decode`] for anything the format rejects.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use fdtable_protocol::{ClientRequest, Codec, JsonCodec, MatchId, MatchRequest};
///
/// let codec = JsonCodec;
/// let req = MatchRequest { match_id: MatchId(1), req: ClientRequest::ExitMatch };
/// let bytes = codec.encode(&req).unwrap();
/// let decoded: MatchRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(req, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::InvalidMessage("empty message".into()));
        }
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
