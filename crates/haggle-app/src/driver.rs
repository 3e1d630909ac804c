//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from platform I/O.
//! A browser-style frontend implements it over a websocket, `fetch`, the
//! Notification API, and the history API; tests implement it over in-memory
//! queues. The generic [`crate::Runtime`] handles all orchestration either
//! way.

use std::{future::Future, ops::Sub, time::Duration};

use haggle_client::HttpRequest;
use haggle_proto::{ChatId, ClientMessage, ServerMessage, model::Chat, rest::ChatList};

use crate::{AppAction, App};

/// Transport notifications the driver surfaces to the runtime.
#[derive(Debug, Clone)]
pub enum TransportSignal {
    /// The dial completed; the socket is up.
    Connected,

    /// The dial failed before the socket came up.
    ConnectFailed {
        /// Driver diagnostic.
        reason: String,
    },

    /// A decoded server event arrived.
    Message(ServerMessage),

    /// The socket closed (peer-initiated, network loss, or stream error).
    Closed,
}

/// Successful completion of an [`HttpRequest`].
#[derive(Debug, Clone)]
pub enum HttpOutcome {
    /// Response of `FetchChats`.
    ChatList(ChatList),

    /// Response of `FetchChat`.
    Chat(Chat),

    /// Response of `CreateChat`.
    Created(Chat),

    /// Bodyless success (`PersistRead`).
    Done,
}

/// Abstracts I/O operations for the application runtime.
///
/// # Associated types
///
/// - [`Error`](Driver::Error): platform-specific error type
/// - [`Instant`](Driver::Instant): time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in tests.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll for the next user intent. `None` if input is idle this cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the input source failed irrecoverably.
    fn poll_input(&mut self)
    -> impl Future<Output = Result<Option<AppAction>, Self::Error>> + Send;

    /// Poll the realtime transport. `None` if nothing happened this cycle.
    fn poll_transport(&mut self) -> impl Future<Output = Option<TransportSignal>> + Send;

    /// Dial the realtime endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the dial fails; the runtime feeds it back into
    /// the retry state machine rather than propagating it.
    fn open_transport(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the transport, or abandon an in-flight dial.
    fn close_transport(&mut self);

    /// Send one event on the realtime channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket rejected the send.
    fn send(&mut self, msg: ClientMessage) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Run an HTTP request against the chat API.
    ///
    /// The error side is a plain diagnostic string: HTTP failures are
    /// operational events for the state machine, not runtime errors.
    fn run_http(
        &mut self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpOutcome, String>> + Send;

    /// Show a desktop notification. Click-through navigation and window
    /// focus are the platform's job.
    fn notify(&mut self, title: &str, body: &str, image: &str, chat_id: &ChatId);

    /// Play the notification sound. Best-effort: failures are swallowed
    /// here and never surface.
    fn play_sound(&mut self);

    /// Ask for desktop notification permission. The answer comes back as
    /// [`AppAction::PermissionChanged`] through [`Driver::poll_input`].
    fn request_permission(&mut self);

    /// Encode the active conversation in the shareable location/URL.
    fn set_location(&mut self, chat_id: &ChatId);

    /// Scroll the conversation view to its newest message.
    fn scroll_to_latest(&mut self, chat_id: &ChatId);

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails irrecoverably.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;
}
