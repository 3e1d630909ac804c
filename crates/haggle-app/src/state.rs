//! Observable application state types.
//!
//! [`ChatRow`] is the render projection of one conversation: the few fields a
//! sidebar row needs, derived from the client's store on every update. The
//! authoritative conversation data stays in the client: rows are rebuilt
//! wholesale, never mutated independently, so they cannot diverge.

use haggle_proto::ChatId;

/// Sidebar row for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRow {
    /// Conversation id.
    pub chat_id: ChatId,
    /// Display name of the other side of the thread.
    pub counterpart: String,
    /// Product the thread is anchored to.
    pub product: String,
    /// Viewer-role unread counter.
    pub unread: u32,
    /// Whether the counterpart is online.
    pub online: bool,
    /// Whether the counterpart is typing in this conversation.
    pub typing: bool,
    /// Last message text, if any.
    pub preview: Option<String>,
}
