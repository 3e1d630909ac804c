//! Application input events.
//!
//! [`AppEvent`]s drive the [`crate::App`] view-model. They originate from the
//! [`crate::Bridge`] (protocol and store updates translated from the client)
//! and from the runtime (ticks).

use haggle_client::ConnectionState;
use haggle_proto::ChatId;

use crate::state::ChatRow;

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic tick.
    Tick,

    /// Conversation rows or the badge changed.
    RowsUpdated {
        /// Fresh render projections, replacing the previous set.
        rows: Vec<ChatRow>,
        /// Total unread badge.
        unread_badge: u32,
    },

    /// The active conversation settled.
    Selected {
        /// Now-active conversation.
        chat_id: ChatId,
    },

    /// Connection state or status line changed.
    ConnectionChanged {
        /// New connection state.
        state: ConnectionState,
        /// Status line ("attempting to reconnect (2/5)"), if any.
        status: Option<String>,
    },

    /// Something went wrong; show a dismissable banner.
    Error {
        /// Banner text.
        message: String,
    },
}
