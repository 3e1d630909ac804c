//! Application side-effects and intents.
//!
//! [`AppAction`]s are instructions produced by the [`crate::App`] state
//! machine for the runtime to execute. Protocol intents are forwarded to the
//! [`crate::Bridge`]; `Render` and `Quit` stay with the runtime.

use haggle_proto::ChatId;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application (widget unmount).
    Quit,

    /// Activate a conversation.
    SelectChat {
        /// Conversation to activate.
        chat_id: ChatId,
    },

    /// Send a message.
    SendMessage {
        /// Target conversation.
        chat_id: ChatId,
        /// Message text.
        content: String,
    },

    /// A keystroke landed in the composer (drives the typing indicator).
    Keystroke {
        /// Conversation being typed in.
        chat_id: ChatId,
    },

    /// Open (or find) the thread for a product.
    CreateChat {
        /// Product to open a thread about.
        product_id: String,
    },

    /// Document focus changed.
    FocusChanged {
        /// Whether the document now has focus.
        focused: bool,
    },

    /// The user answered the notification permission prompt.
    PermissionChanged {
        /// Whether notifications were granted.
        granted: bool,
    },
}
