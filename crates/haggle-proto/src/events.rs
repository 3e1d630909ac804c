//! Realtime channel events.
//!
//! Two top-level enums cover the two directions, tagged with the wire event
//! name (`{"event": "joinChat", "data": ...}`). The event name alone
//! identifies the payload shape, so decoding a mismatched name/payload pair
//! fails instead of producing a confused value.
//!
//! # Invariants
//!
//! - Each variant corresponds to exactly one wire event name.
//! - Decoding is total: any malformed frame becomes a [`ProtocolError`],
//!   never a panic. The transport logs and skips such frames.

use serde::{Deserialize, Serialize};

use crate::{
    ProtocolError,
    model::{Chat, ChatId, Participant, Product, UserId},
};

/// Events sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Complete the auth handshake after transport connect. Carries the raw
    /// bearer token; the server revalidates it on every privileged action.
    Authenticate {
        /// Opaque bearer token from session storage.
        token: String,
    },

    /// Subscribe to a conversation's room.
    JoinChat(ChatId),

    /// Unsubscribe from a conversation's room.
    LeaveChat(ChatId),

    /// Advisory "I am typing" for a conversation. Debounced client-side;
    /// there is no explicit stop event in this direction.
    Typing(ChatId),

    /// Send a message to a conversation.
    SendMessage {
        /// Target conversation.
        chat_id: ChatId,
        /// Message text.
        content: String,
    },

    /// Read receipt for every message in a conversation.
    MarkAsRead(ChatId),
}

/// Events pushed from the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Acknowledgment of [`ClientMessage::Authenticate`].
    Authenticated {
        /// Whether the token was accepted.
        success: bool,
        /// Authenticated user id on success.
        #[serde(default)]
        user_id: Option<UserId>,
        /// Human-readable reason on failure.
        #[serde(default)]
        error: Option<String>,
    },

    /// Full presence snapshot; replaces any previously known set.
    OnlineUsers(Vec<UserId>),

    /// Presence delta for a single user.
    UserStatus {
        /// User whose presence changed.
        user_id: UserId,
        /// Whether the user now has a live connection.
        is_online: bool,
    },

    /// Room membership ack for [`ClientMessage::JoinChat`].
    JoinedChat(ChatId),

    /// Room membership ack for [`ClientMessage::LeaveChat`].
    LeftChat(ChatId),

    /// Another participant started typing.
    UserTyping {
        /// Conversation being typed in.
        chat_id: ChatId,
        /// The typist.
        user_id: UserId,
    },

    /// Another participant stopped typing.
    UserStoppedTyping {
        /// Conversation the typist was in.
        chat_id: ChatId,
        /// The typist.
        user_id: UserId,
    },

    /// Push update carrying the full authoritative conversation.
    NewMessage {
        /// Replacement conversation object, last-write-wins at this
        /// granularity.
        chat: Chat,
    },

    /// Out-of-room notice about a message in a conversation the client is not
    /// currently subscribed to.
    MessageNotification {
        /// Author of the message.
        sender: Participant,
        /// Message text.
        message: String,
        /// Product the conversation is anchored to.
        product: Product,
        /// Conversation the message belongs to.
        chat_id: ChatId,
    },

    /// Read receipt relay from another participant or another session.
    MessagesRead {
        /// Conversation that was read.
        chat_id: ChatId,
        /// User who read it.
        user_id: UserId,
    },

    /// Generic channel error.
    Error(String),
}

impl ClientMessage {
    /// Wire event name, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::JoinChat(_) => "joinChat",
            Self::LeaveChat(_) => "leaveChat",
            Self::Typing(_) => "typing",
            Self::SendMessage { .. } => "sendMessage",
            Self::MarkAsRead(_) => "markAsRead",
        }
    }

    /// Encode to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails (practically
    /// unreachable for these types).
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode { reason: e.to_string() })
    }
}

impl ServerMessage {
    /// Decode from a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedEvent`] for unknown event names,
    /// payload shape mismatches, or invalid JSON.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text)
            .map_err(|e| ProtocolError::MalformedEvent { reason: e.to_string() })
    }
}
