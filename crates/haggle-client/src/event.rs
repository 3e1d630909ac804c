//! Client events and actions.

use haggle_proto::{
    ChatId, ClientMessage, ServerMessage,
    model::Chat,
    rest::ChatList,
};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving and decoding frames from the realtime transport
/// - Running HTTP requests and feeding completions back
/// - Driving time forward via ticks
/// - Forwarding user intents (select a conversation, type, send)
///
/// Generic over `I` (instant type) to support both production
/// (`std::time::Instant`) and virtual-clock test environments.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Begin operation: bootstrap the store over HTTP and dial the realtime
    /// transport. Without a complete identity the client stays down and
    /// exposes an authentication-required condition instead.
    Start,

    /// Time tick for timeout processing.
    ///
    /// Resolves retry deadlines, bounded room-switch ack waits, the typing
    /// idle timeout, and the refresh/polling schedules.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// The realtime transport finished connecting.
    TransportConnected,

    /// A dial attempt failed before the transport came up.
    ConnectFailed {
        /// Driver diagnostic.
        reason: String,
    },

    /// An established transport dropped (peer-initiated or network loss).
    TransportClosed,

    /// Decoded event pushed by the server.
    ServerMessage(ServerMessage),

    /// Completion of [`HttpRequest::FetchChats`].
    ChatListFetched {
        /// Conversation list plus total unread badge.
        list: ChatList,
    },

    /// Completion of [`HttpRequest::FetchChat`] (degraded-mode polling).
    ChatFetched {
        /// Fresh conversation to swap in wholesale.
        chat: Chat,
    },

    /// Completion of [`HttpRequest::CreateChat`].
    ChatCreated {
        /// The created (or found) conversation.
        chat: Chat,
    },

    /// An HTTP request failed. The store keeps whatever state it has.
    FetchFailed {
        /// The request that failed.
        request: HttpRequest,
        /// Driver diagnostic.
        message: String,
    },

    /// User selected a conversation.
    SelectChat {
        /// Conversation to activate.
        chat_id: ChatId,
    },

    /// User pressed a key in the composer of a conversation.
    Keystroke {
        /// Conversation being typed in.
        chat_id: ChatId,
    },

    /// User submitted a message.
    SendMessage {
        /// Target conversation.
        chat_id: ChatId,
        /// Message text.
        content: String,
    },

    /// User opened a chat about a product ("message the seller").
    CreateChat {
        /// Product to open a thread about.
        product_id: String,
    },

    /// Document focus changed; gates desktop notifications.
    FocusChanged {
        /// Whether the document now has focus.
        focused: bool,
    },

    /// Outcome of [`ClientAction::RequestNotificationPermission`].
    PermissionChanged {
        /// Whether the user granted notifications.
        granted: bool,
    },

    /// Tear down: close the transport and disarm every deadline.
    Stop,
}

/// HTTP requests the client asks the driver to run.
///
/// Completions come back as [`ClientEvent::ChatListFetched`],
/// [`ClientEvent::ChatFetched`], [`ClientEvent::ChatCreated`], or
/// [`ClientEvent::FetchFailed`]. `PersistRead` is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpRequest {
    /// `GET /api/chat`: full list plus total unread.
    FetchChats,

    /// `GET /api/chat/:id`: single conversation (degraded-mode polling).
    FetchChat {
        /// Conversation to fetch.
        chat_id: ChatId,
    },

    /// `PUT /api/chat/:id/read`: persist a read receipt.
    PersistRead {
        /// Conversation that was read.
        chat_id: ChatId,
    },

    /// `POST /api/chat`: create or find the thread for a product.
    CreateChat {
        /// Product to open a thread about.
        product_id: String,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Dial the realtime transport.
    OpenTransport,

    /// Close the realtime transport (or abandon an in-flight dial).
    CloseTransport,

    /// Send an event on the realtime channel.
    Emit(ClientMessage),

    /// Run an HTTP request against the chat API.
    Http(HttpRequest),

    /// Encode the active conversation in the shareable location/URL so a
    /// reload or deep link restores the selection.
    UpdateLocation {
        /// Now-active conversation.
        chat_id: ChatId,
    },

    /// Scroll the active conversation's view to its newest message.
    ScrollToLatest {
        /// Conversation to scroll.
        chat_id: ChatId,
    },

    /// Show a desktop notification. Clicking it navigates to the
    /// conversation and focuses the window: that part is the driver's job.
    Notify {
        /// Sender display name.
        title: String,
        /// Truncated message preview.
        body: String,
        /// Product image URL.
        image: String,
        /// Conversation to navigate to on click.
        chat_id: ChatId,
    },

    /// Play the notification sound. Best-effort: playback failures are
    /// swallowed by the driver, never surfaced.
    PlaySound,

    /// Ask the user for desktop notification permission. Emitted at most
    /// once per session.
    RequestNotificationPermission,

    /// Surface a dismissable error banner.
    SurfaceError {
        /// Banner text.
        message: String,
    },

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}
