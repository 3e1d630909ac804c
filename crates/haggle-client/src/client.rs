//! Chat client state machine.
//!
//! The `Client` is the top-level state machine behind the chat widget. It
//! composes the connection lifecycle with the room membership tracker, the
//! presence/typing tracker, the conversation store, and the notification
//! dispatcher, and is the single place where their effects are stitched into
//! the action stream the driver executes.

use haggle_core::{
    connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionError, ConnectionState, Identity},
    env::Environment,
};
use haggle_proto::{
    ChatId, ClientMessage, ServerMessage, UserId,
    model::Chat,
};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent, HttpRequest},
    notify::{Notifier, Permission},
    presence::PresenceTracker,
    rooms::{RoomEffect, RoomTracker},
    store::ChatStore,
};

/// Client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Connection retry/degrade tuning.
    pub connection: ConnectionConfig,
    /// Conversation id from the URL, restored as the initial selection if
    /// the bootstrap fetch knows it.
    pub deep_link: Option<ChatId>,
}

/// Chat client for the storefront's realtime channel.
pub struct Client<E: Environment> {
    env: E,
    config: ClientConfig,
    connection: Connection<E::Instant>,
    rooms: RoomTracker<E::Instant>,
    presence: PresenceTracker<E::Instant>,
    store: ChatStore<E::Instant>,
    notifier: Notifier,
}

impl<E: Environment> Client<E> {
    /// Create a new client.
    ///
    /// Without a complete identity triple the client stays down and exposes
    /// an authentication-required condition instead of ever connecting.
    pub fn new(env: E, identity: Option<Identity>, config: ClientConfig) -> Self {
        let viewer = identity.as_ref().map(|i| i.user_id.clone()).unwrap_or_default();
        let connection = Connection::new(identity, config.connection.clone());
        Self {
            env,
            config,
            connection,
            rooms: RoomTracker::new(),
            presence: PresenceTracker::new(),
            store: ChatStore::new(viewer),
            notifier: Notifier::new(),
        }
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Only caller misuse errors ([`ClientError`]); network input never
    /// fails, it is absorbed or logged.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Start => Ok(self.handle_start()),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::TransportConnected => {
                Ok(map_connection_actions(self.connection.handle_transport_connected()))
            },
            ClientEvent::ConnectFailed { reason } => Ok(self.handle_connect_failed(&reason)),
            ClientEvent::TransportClosed => Ok(self.handle_transport_closed()),
            ClientEvent::ServerMessage(msg) => Ok(self.handle_server_message(msg)),
            ClientEvent::ChatListFetched { list } => self.handle_chat_list(list),
            ClientEvent::ChatFetched { chat } => {
                self.store.replace_chat(chat);
                Ok(vec![])
            },
            ClientEvent::ChatCreated { chat } => {
                let chat_id = chat.id.clone();
                self.store.replace_chat(chat);
                self.select_chat(chat_id)
            },
            ClientEvent::FetchFailed { request, message } => Ok(handle_fetch_failed(&request, &message)),
            ClientEvent::SelectChat { chat_id } => self.select_chat(chat_id),
            ClientEvent::Keystroke { chat_id } => Ok(self.handle_keystroke(chat_id)),
            ClientEvent::SendMessage { chat_id, content } => self.handle_send(chat_id, &content),
            ClientEvent::CreateChat { product_id } => {
                Ok(vec![ClientAction::Http(HttpRequest::CreateChat { product_id })])
            },
            ClientEvent::FocusChanged { focused } => {
                self.notifier.set_focused(focused);
                Ok(vec![])
            },
            ClientEvent::PermissionChanged { granted } => {
                self.notifier.set_permission(granted);
                Ok(vec![])
            },
            ClientEvent::Stop => Ok(self.handle_stop()),
        }
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Current connection error condition, if any.
    pub fn connection_error(&self) -> Option<&ConnectionError> {
        self.connection.error()
    }

    /// Transient connection status line ("attempting to reconnect (2/5)").
    pub fn status_message(&self) -> Option<&str> {
        self.connection.status_message()
    }

    /// Whether retries are exhausted and the store polls over HTTP.
    pub fn is_degraded(&self) -> bool {
        self.connection.is_degraded()
    }

    /// The active (UI-selected) conversation.
    pub fn active_chat(&self) -> Option<&ChatId> {
        self.rooms.active()
    }

    /// The room currently joined on the transport.
    pub fn joined_chat(&self) -> Option<&ChatId> {
        self.rooms.joined()
    }

    /// All conversations, in server order.
    pub fn chats(&self) -> &[Chat] {
        self.store.chats()
    }

    /// Look up a conversation by id.
    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.store.get(chat_id)
    }

    /// Total unread badge across all conversations.
    pub fn total_unread(&self) -> u32 {
        self.store.total_unread()
    }

    /// Whether `user` currently has a live connection.
    pub fn is_online(&self, user: &str) -> bool {
        self.presence.is_online(user)
    }

    /// Who is typing in `chat_id`, if anyone.
    pub fn typist(&self, chat_id: &str) -> Option<&UserId> {
        self.presence.typist(chat_id)
    }

    /// Desktop notification permission state.
    pub fn notification_permission(&self) -> Permission {
        self.notifier.permission()
    }

    /// Locally known viewer id, if signed in.
    pub fn user_id(&self) -> Option<&UserId> {
        self.connection.identity().map(|i| &i.user_id)
    }

    fn handle_start(&mut self) -> Vec<ClientAction> {
        if self.connection.identity().is_none() {
            let _ = self.connection.start();
            return vec![ClientAction::Log {
                message: "chat requires a signed-in session; staying offline".to_owned(),
            }];
        }

        // HTTP bootstrap seeds the store before any realtime event arrives
        let now = self.env.now();
        let mut actions = self.store.bootstrap_request(now);
        actions.extend(map_connection_actions(self.connection.start()));
        actions
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let mut actions = map_connection_actions(self.connection.tick(now));

        let live = self.connection.is_usable();
        let effects = self.rooms.tick(live, now);
        actions.extend(self.apply_room_effects(effects));

        self.presence.tick(now);

        actions.extend(self.store.tick(now, self.connection.is_degraded(), self.rooms.active()));
        actions
    }

    fn handle_connect_failed(&mut self, reason: &str) -> Vec<ClientAction> {
        let was_degraded = self.connection.is_degraded();
        let mut actions = map_connection_actions(self.connection.handle_connect_failed(self.env.now()));
        actions.push(ClientAction::Log {
            message: format!("chat transport dial failed: {reason}"),
        });

        if !was_degraded && self.connection.is_degraded()
            && let Some(error) = self.connection.error()
        {
            actions.push(ClientAction::SurfaceError { message: error.to_string() });
        }
        actions
    }

    fn handle_transport_closed(&mut self) -> Vec<ClientAction> {
        let mut actions = map_connection_actions(self.connection.handle_transport_closed(self.env.now()));

        // Advisory state and room membership do not survive the socket
        self.presence.reset();
        let effects = self.rooms.handle_transport_down();
        actions.extend(self.apply_room_effects(effects));
        actions
    }

    fn handle_server_message(&mut self, msg: ServerMessage) -> Vec<ClientAction> {
        match msg {
            ServerMessage::Authenticated { success, user_id, error } => {
                self.handle_authenticated(success, user_id, error)
            },
            ServerMessage::OnlineUsers(users) => {
                self.presence.apply_snapshot(users);
                vec![]
            },
            ServerMessage::UserStatus { user_id, is_online } => {
                self.presence.apply_status(user_id, is_online);
                vec![]
            },
            ServerMessage::JoinedChat(chat_id) => {
                self.rooms.handle_joined_ack(&chat_id);
                vec![]
            },
            ServerMessage::LeftChat(chat_id) => {
                let live = self.connection.is_usable();
                let now = self.env.now();
                let effects = self.rooms.handle_left_ack(&chat_id, live, now);
                self.apply_room_effects(effects)
            },
            ServerMessage::UserTyping { chat_id, user_id } => {
                self.presence.handle_user_typing(chat_id, user_id);
                vec![]
            },
            ServerMessage::UserStoppedTyping { chat_id, user_id } => {
                self.presence.handle_user_stopped_typing(&chat_id, &user_id);
                vec![]
            },
            ServerMessage::NewMessage { chat } => {
                // Implicit stopped-typing: a message from this chat arrived
                self.presence.message_arrived(&chat.id);

                let is_active = self.rooms.active() == Some(&chat.id);
                let live = self.connection.is_usable();
                self.store.apply_new_message(chat, is_active, live)
            },
            ServerMessage::MessageNotification { sender, message, product, chat_id } => {
                self.store.apply_notification();
                self.notifier.handle_notification(&sender, &message, &product, &chat_id)
            },
            ServerMessage::MessagesRead { chat_id, user_id } => {
                let is_active = self.rooms.active() == Some(&chat_id);
                self.store.apply_messages_read(&chat_id, &user_id, is_active);
                vec![]
            },
            ServerMessage::Error(message) => vec![
                ClientAction::SurfaceError { message: format!("chat channel error: {message}") },
                ClientAction::Log { message: format!("server error event: {message}") },
            ],
        }
    }

    fn handle_authenticated(
        &mut self,
        success: bool,
        user_id: Option<UserId>,
        error: Option<String>,
    ) -> Vec<ClientAction> {
        let mut actions = map_connection_actions(self.connection.handle_authenticated(success, error));

        if self.connection.is_usable() {
            if let (Some(acked), Some(local)) = (&user_id, self.user_id())
                && acked != local
            {
                actions.push(ClientAction::Log {
                    message: format!("authenticated as {acked} but session claims {local}"),
                });
            }

            // Server-side room membership did not survive the reconnect
            let now = self.env.now();
            let effects = self.rooms.handle_authenticated(now);
            actions.extend(self.apply_room_effects(effects));
        } else if let Some(error) = self.connection.error() {
            actions.push(ClientAction::SurfaceError { message: error.to_string() });
        }
        actions
    }

    fn handle_chat_list(
        &mut self,
        list: haggle_proto::rest::ChatList,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let first = !self.store.is_bootstrapped();
        self.store.apply_chat_list(list);

        // A deep-linked conversation becomes the initial selection
        if first
            && let Some(chat_id) = self.config.deep_link.clone()
            && self.store.get(&chat_id).is_some()
        {
            return self.select_chat(chat_id);
        }
        Ok(vec![])
    }

    fn handle_keystroke(&mut self, chat_id: ChatId) -> Vec<ClientAction> {
        if !self.connection.is_usable() {
            // Advisory only; nothing to tell anyone while offline
            return vec![];
        }
        if self.presence.keystroke(&chat_id, self.env.now()) {
            return vec![ClientAction::Emit(ClientMessage::Typing(chat_id))];
        }
        vec![]
    }

    fn handle_send(
        &mut self,
        chat_id: ChatId,
        content: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        if self.store.get(&chat_id).is_none() {
            return Err(ClientError::ChatNotFound { chat_id });
        }
        if !self.connection.is_usable() {
            return Err(ClientError::NotConnected { operation: "send a message" });
        }

        self.presence.message_sent(&chat_id);
        Ok(vec![ClientAction::Emit(ClientMessage::SendMessage {
            chat_id,
            content: content.to_owned(),
        })])
    }

    fn handle_stop(&mut self) -> Vec<ClientAction> {
        let actions = map_connection_actions(self.connection.shutdown());
        self.rooms.reset();
        self.presence.reset();
        actions
    }

    fn select_chat(&mut self, chat_id: ChatId) -> Result<Vec<ClientAction>, ClientError> {
        if self.store.get(&chat_id).is_none() {
            return Err(ClientError::ChatNotFound { chat_id });
        }

        let live = self.connection.is_usable();
        let now = self.env.now();
        let effects = self.rooms.select(chat_id, live, now);
        Ok(self.apply_room_effects(effects))
    }

    /// Stitch room tracker effects into the action stream: membership events
    /// on the wire, mark-as-read + location + scroll for an activation.
    fn apply_room_effects(&mut self, effects: Vec<RoomEffect>) -> Vec<ClientAction> {
        let live = self.connection.is_usable();
        let mut actions = Vec::new();
        let mut activated = None;

        for effect in effects {
            match effect {
                RoomEffect::Leave(chat_id) => {
                    actions.push(ClientAction::Emit(ClientMessage::LeaveChat(chat_id)));
                },
                RoomEffect::Join(chat_id) => {
                    actions.push(ClientAction::Emit(ClientMessage::JoinChat(chat_id)));
                },
                RoomEffect::Activated(chat_id) => {
                    if self.store.get(&chat_id).is_some_and(Chat::has_messages) {
                        actions.extend(self.store.mark_as_read(&chat_id, live));
                    }
                    activated = Some(chat_id);
                },
            }
        }

        if let Some(chat_id) = activated {
            actions.push(ClientAction::UpdateLocation { chat_id: chat_id.clone() });
            actions.push(ClientAction::ScrollToLatest { chat_id });
        }
        actions
    }
}

fn map_connection_actions(conn_actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
    conn_actions
        .into_iter()
        .map(|action| match action {
            ConnectionAction::OpenTransport => ClientAction::OpenTransport,
            ConnectionAction::CloseTransport => ClientAction::CloseTransport,
            ConnectionAction::SendAuthenticate { token } => {
                ClientAction::Emit(ClientMessage::Authenticate { token })
            },
        })
        .collect()
}

fn handle_fetch_failed(request: &HttpRequest, message: &str) -> Vec<ClientAction> {
    let banner = match request {
        HttpRequest::FetchChats => "failed to load conversations",
        HttpRequest::FetchChat { .. } => "failed to refresh conversation",
        HttpRequest::PersistRead { .. } => "failed to sync read receipt",
        HttpRequest::CreateChat { .. } => "failed to start conversation",
    };
    vec![
        ClientAction::SurfaceError { message: format!("{banner}: {message}") },
        ClientAction::Log { message: format!("http request failed ({request:?}): {message}") },
    ]
}
