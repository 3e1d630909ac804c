//! Protocol error types.

use thiserror::Error;

/// Errors produced while encoding or decoding wire events.
///
/// Decode failures are expected operational events (a misbehaving server, a
/// frame from a newer protocol revision) and are logged-and-skipped at the
/// transport boundary rather than propagated into state machines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Inbound frame was not a recognizable event.
    #[error("malformed event: {reason}")]
    MalformedEvent {
        /// Decoder diagnostic.
        reason: String,
    },

    /// Outbound event could not be serialized.
    #[error("event encode failed: {reason}")]
    Encode {
        /// Encoder diagnostic.
        reason: String,
    },
}
