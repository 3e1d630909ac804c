//! Client error types.

use haggle_proto::ChatId;
use thiserror::Error;

/// Errors returned by the client state machine for caller misuse.
///
/// These never originate from network input; malformed frames are dropped at
/// the transport boundary and server pushes for unknown conversations are
/// absorbed. A `ClientError` means the caller asked for something the current
/// state cannot honor, and the application layer turns it into a retryable
/// banner rather than crashing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The referenced conversation is not in the store.
    #[error("unknown conversation {chat_id}")]
    ChatNotFound {
        /// The id that failed to resolve.
        chat_id: ChatId,
    },

    /// The operation needs an authenticated realtime channel.
    #[error("cannot {operation}: realtime channel is not connected")]
    NotConnected {
        /// What was attempted.
        operation: &'static str,
    },

    /// Outbound message with no visible content.
    #[error("message content is empty")]
    EmptyMessage,
}
