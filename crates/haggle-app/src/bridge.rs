//! Protocol-to-application translation layer.
//!
//! The [`Bridge`] wraps the low-level [`haggle_client::Client`] and adapts it
//! to the application lifecycle:
//!
//! - Converts high-level [`crate::AppAction`] intents into client events.
//! - Accumulates outgoing wire messages, pending HTTP requests, and UI
//!   effects for the driver to execute in the next I/O cycle.
//! - Interprets client actions and state changes and converts them back into
//!   [`crate::AppEvent`]s to update the view-model.
//!
//! Client errors become error banners here, never panics; the presentation
//! layer only ever sees status fields and events.

use haggle_client::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, ConnectionState, Environment,
    HttpRequest, Identity,
};
use haggle_proto::{ChatId, ClientMessage};

use crate::{AppAction, AppEvent, state::ChatRow};

/// UI side effects for the driver (notifications, sound, URL, scrolling,
/// transport control).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    /// Dial the realtime transport.
    OpenTransport,

    /// Close the realtime transport.
    CloseTransport,

    /// Show a desktop notification; clicking it navigates to the chat.
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

    /// Play the notification sound (best-effort).
    PlaySound,

    /// Ask for desktop notification permission.
    RequestPermission,

    /// Encode the active conversation in the shareable URL.
    UpdateLocation {
        /// Now-active conversation.
        chat_id: ChatId,
    },

    /// Scroll the conversation view to its newest message.
    ScrollToLatest {
        /// Conversation to scroll.
        chat_id: ChatId,
    },
}

/// Bridge between App and Client protocol logic.
///
/// Generic over Environment so production and virtual-clock tests share the
/// code path.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<ClientMessage>,
    http: Vec<HttpRequest>,
    effects: Vec<UiEffect>,
    last_connection: ConnectionState,
    last_status: Option<String>,
    last_active: Option<ChatId>,
    last_rows: Vec<ChatRow>,
    last_badge: u32,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge with the given environment and identity.
    pub fn new(env: E, identity: Option<Identity>, config: ClientConfig) -> Self {
        let client = Client::new(env, identity, config);
        Self {
            client,
            outgoing: Vec::new(),
            http: Vec::new(),
            effects: Vec::new(),
            last_connection: ConnectionState::Disconnected,
            last_status: None,
            last_active: None,
            last_rows: Vec::new(),
            last_badge: 0,
        }
    }

    /// The wrapped client, for read-only inspection.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Begin operation (bootstrap + dial).
    pub fn start(&mut self) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Start)
    }

    /// Feed one client event through the state machine and translate the
    /// outcome into App events.
    pub fn dispatch(&mut self, event: ClientEvent<E::Instant>) -> Vec<AppEvent> {
        let result = self.client.handle(event);
        let mut events = self.handle_client_result(result);
        events.extend(self.state_diff_events());
        events
    }

    /// Process an App intent and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::SelectChat { chat_id } => self.dispatch(ClientEvent::SelectChat { chat_id }),
            AppAction::SendMessage { chat_id, content } => {
                self.dispatch(ClientEvent::SendMessage { chat_id, content })
            },
            AppAction::Keystroke { chat_id } => self.dispatch(ClientEvent::Keystroke { chat_id }),
            AppAction::CreateChat { product_id } => {
                self.dispatch(ClientEvent::CreateChat { product_id })
            },
            AppAction::FocusChanged { focused } => {
                self.dispatch(ClientEvent::FocusChanged { focused })
            },
            AppAction::PermissionChanged { granted } => {
                self.dispatch(ClientEvent::PermissionChanged { granted })
            },
            AppAction::Render | AppAction::Quit => vec![],
        }
    }

    /// Take pending outgoing wire messages.
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take pending HTTP requests.
    pub fn take_http(&mut self) -> Vec<HttpRequest> {
        std::mem::take(&mut self.http)
    }

    /// Take pending UI effects.
    pub fn take_effects(&mut self) -> Vec<UiEffect> {
        std::mem::take(&mut self.effects)
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            // Caller misuse (switch to an unknown chat, send while offline):
            // retryable banner, previous state stands
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::OpenTransport => self.effects.push(UiEffect::OpenTransport),
                ClientAction::CloseTransport => self.effects.push(UiEffect::CloseTransport),
                ClientAction::Emit(msg) => self.outgoing.push(msg),
                ClientAction::Http(request) => self.http.push(request),
                ClientAction::UpdateLocation { chat_id } => {
                    self.effects.push(UiEffect::UpdateLocation { chat_id });
                },
                ClientAction::ScrollToLatest { chat_id } => {
                    self.effects.push(UiEffect::ScrollToLatest { chat_id });
                },
                ClientAction::Notify { title, body, image, chat_id } => {
                    self.effects.push(UiEffect::Notify { title, body, image, chat_id });
                },
                ClientAction::PlaySound => self.effects.push(UiEffect::PlaySound),
                ClientAction::RequestNotificationPermission => {
                    self.effects.push(UiEffect::RequestPermission);
                },
                ClientAction::SurfaceError { message } => {
                    events.push(AppEvent::Error { message });
                },
                ClientAction::Log { message } => tracing::debug!("{message}"),
            }
        }

        events
    }

    /// Diff observable client state against the last emission and produce
    /// the corresponding App events.
    fn state_diff_events(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();

        let connection = self.client.connection_state();
        let status = self.client.status_message().map(str::to_owned);
        if connection != self.last_connection || status != self.last_status {
            self.last_connection = connection;
            self.last_status.clone_from(&status);
            events.push(AppEvent::ConnectionChanged { state: connection, status });
        }

        let active = self.client.active_chat().cloned();
        if active != self.last_active {
            self.last_active.clone_from(&active);
            if let Some(chat_id) = active {
                events.push(AppEvent::Selected { chat_id });
            }
        }

        let rows = self.build_rows();
        let badge = self.client.total_unread();
        if rows != self.last_rows || badge != self.last_badge {
            self.last_rows.clone_from(&rows);
            self.last_badge = badge;
            events.push(AppEvent::RowsUpdated { rows, unread_badge: badge });
        }

        events
    }

    fn build_rows(&self) -> Vec<ChatRow> {
        let viewer = self.client.user_id().cloned().unwrap_or_default();

        self.client
            .chats()
            .iter()
            .map(|chat| {
                let role = chat.role_of(&viewer);
                let counterpart = role.map_or(&chat.seller, |r| chat.counterpart(r));
                ChatRow {
                    chat_id: chat.id.clone(),
                    counterpart: counterpart.name.clone(),
                    product: chat.product.name.clone(),
                    unread: role.map_or(0, |r| chat.unread_count.get(r)),
                    online: self.client.is_online(&counterpart.id),
                    typing: self
                        .client
                        .typist(&chat.id)
                        .is_some_and(|typist| *typist == counterpart.id),
                    preview: chat.messages.last().map(|m| m.content.clone()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use haggle_client::AccountRole;
    use haggle_core::env::test_utils::MockEnv;
    use haggle_proto::{
        ServerMessage,
        model::{Chat, Message, Participant, Product, UnreadCount},
        rest::ChatList,
    };

    use super::*;

    fn identity() -> Identity {
        Identity { token: "tok".into(), user_id: "buyer".into(), role: AccountRole::Buyer }
    }

    fn chat(id: &str) -> Chat {
        Chat {
            id: id.into(),
            buyer: Participant { id: "buyer".into(), name: "Ada".into(), profile_image: None },
            seller: Participant { id: "seller".into(), name: "Grace".into(), profile_image: None },
            product: Product {
                id: "p1".into(),
                name: "Walnut desk".into(),
                image: "desk.jpg".into(),
                price: 249.0,
            },
            messages: vec![Message {
                sender: "seller".into(),
                content: "hello there".into(),
                created_at: Utc::now(),
                read_by: vec!["seller".into()],
            }],
            unread_count: UnreadCount { buyer: 1, seller: 0 },
        }
    }

    fn bridge() -> Bridge<MockEnv> {
        Bridge::new(MockEnv::new(), Some(identity()), ClientConfig::default())
    }

    #[test]
    fn start_queues_bootstrap_fetch_and_dial() {
        let mut bridge = bridge();
        let _ = bridge.start();

        assert_eq!(bridge.take_http(), vec![HttpRequest::FetchChats]);
        assert_eq!(bridge.take_effects(), vec![UiEffect::OpenTransport]);
    }

    #[test]
    fn bootstrap_produces_rows_for_the_view() {
        let mut bridge = bridge();
        let _ = bridge.start();

        let events = bridge.dispatch(ClientEvent::ChatListFetched {
            list: ChatList { chats: vec![chat("c1")], total_unread: 1 },
        });

        let rows_event = events.iter().find_map(|e| match e {
            AppEvent::RowsUpdated { rows, unread_badge } => Some((rows.clone(), *unread_badge)),
            _ => None,
        });
        let (rows, badge) = rows_event.unwrap();
        assert_eq!(badge, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].counterpart, "Grace");
        assert_eq!(rows[0].unread, 1);
        assert_eq!(rows[0].preview.as_deref(), Some("hello there"));
    }

    #[test]
    fn selecting_unknown_chat_becomes_an_error_banner() {
        let mut bridge = bridge();
        let _ = bridge.start();

        let events = bridge.process_app_action(AppAction::SelectChat { chat_id: "ghost".into() });
        assert!(events.iter().any(|e| matches!(e, AppEvent::Error { .. })));
    }

    #[test]
    fn connection_transitions_emit_changes_once() {
        let mut bridge = bridge();
        let _ = bridge.start();

        let events = bridge.dispatch(ClientEvent::TransportConnected);
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::ConnectionChanged { state: ConnectionState::Connected, .. }
        )));

        // No change, no event
        let events = bridge.dispatch(ClientEvent::FocusChanged { focused: true });
        assert!(!events.iter().any(|e| matches!(e, AppEvent::ConnectionChanged { .. })));
    }

    #[test]
    fn selection_settles_into_a_selected_event() {
        let mut bridge = bridge();
        let _ = bridge.start();
        let _ = bridge.dispatch(ClientEvent::ChatListFetched {
            list: ChatList { chats: vec![chat("c1")], total_unread: 1 },
        });
        let _ = bridge.take_outgoing();
        let _ = bridge.take_http();

        let events = bridge.process_app_action(AppAction::SelectChat { chat_id: "c1".into() });
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::Selected { chat_id } if chat_id == "c1"
        )));
        // Offline selection still persists the read receipt over HTTP
        assert_eq!(bridge.take_http(), vec![HttpRequest::PersistRead { chat_id: "c1".into() }]);
    }

    #[test]
    fn notification_becomes_ui_effects() {
        let mut bridge = bridge();
        let _ = bridge.start();
        let _ = bridge.dispatch(ClientEvent::FocusChanged { focused: false });
        let _ = bridge.dispatch(ClientEvent::PermissionChanged { granted: true });

        let _ = bridge.dispatch(ClientEvent::ServerMessage(ServerMessage::MessageNotification {
            sender: Participant { id: "seller".into(), name: "Grace".into(), profile_image: None },
            message: "are you still interested?".into(),
            product: Product {
                id: "p1".into(),
                name: "Walnut desk".into(),
                image: "desk.jpg".into(),
                price: 249.0,
            },
            chat_id: "c9".into(),
        }));

        let effects = bridge.take_effects();
        assert!(effects.iter().any(|e| matches!(e, UiEffect::Notify { .. })));
        assert!(effects.contains(&UiEffect::PlaySound));
    }
}
