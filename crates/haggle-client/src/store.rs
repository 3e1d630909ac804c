//! Conversation store and read-receipt reconciliation.
//!
//! The store owns the conversation list. The server is authoritative at
//! conversation granularity: a realtime push or a poll result replaces the
//! stored object wholesale, never merges message-by-message. On top of that
//! the store keeps the unread counters correct under concurrent activity:
//! optimistic local increments for messages in non-active conversations,
//! explicit mark-as-read (local + HTTP + realtime signal), and grow-only
//! `read_by` unions for receipt relays.
//!
//! It also schedules the two HTTP backstops: a 60-second full-list refresh
//! that runs regardless of connectivity, and a 3-second single-conversation
//! poll that runs only while the connection is degraded.

use std::{ops::Sub, time::Duration};

use haggle_proto::{
    ChatId, ClientMessage, UserId,
    model::Chat,
    rest::ChatList,
};

use crate::event::{ClientAction, HttpRequest};

/// Full conversation-list refresh interval (consistency backstop against
/// missed realtime events).
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Active-conversation poll interval while degraded.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Conversation store with unread bookkeeping and fetch scheduling.
#[derive(Debug, Clone)]
pub struct ChatStore<I> {
    viewer: UserId,
    chats: Vec<Chat>,
    total_unread: u32,
    bootstrapped: bool,
    last_refresh: Option<I>,
    last_poll: Option<I>,
}

impl<I> ChatStore<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create an empty store for the given viewer.
    pub fn new(viewer: UserId) -> Self {
        Self {
            viewer,
            chats: Vec::new(),
            total_unread: 0,
            bootstrapped: false,
            last_refresh: None,
            last_poll: None,
        }
    }

    /// All conversations, in server order.
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    /// Look up a conversation by id.
    pub fn get(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    /// Total unread badge across all conversations.
    pub fn total_unread(&self) -> u32 {
        self.total_unread
    }

    /// Whether the initial HTTP bootstrap has completed.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Issue the initial list fetch. Seeds the store before any realtime
    /// event can arrive.
    pub fn bootstrap_request(&mut self, now: I) -> Vec<ClientAction> {
        self.last_refresh = Some(now);
        vec![ClientAction::Http(HttpRequest::FetchChats)]
    }

    /// Apply a full-list fetch result (bootstrap or periodic refresh).
    ///
    /// Authoritative: replaces the list and the badge, absorbing any drift
    /// the optimistic increments accumulated.
    pub fn apply_chat_list(&mut self, list: ChatList) {
        self.chats = list.chats;
        self.total_unread = list.total_unread;
        self.bootstrapped = true;
    }

    /// Replace one conversation wholesale (poll result, created chat, or a
    /// push). Unknown ids are appended: a brand-new thread is first seen
    /// this way.
    pub fn replace_chat(&mut self, chat: Chat) {
        match self.chats.iter_mut().find(|c| c.id == chat.id) {
            Some(slot) => *slot = chat,
            None => self.chats.push(chat),
        }
    }

    /// Reconcile an inbound `newMessage` push.
    ///
    /// The pushed conversation replaces the stored one. For the active
    /// conversation the user is presumably looking at it, so it is marked
    /// read immediately (server told too, not just a local counter reset)
    /// and the view scrolls. Otherwise the viewer's counter and the global
    /// badge each take an optimistic +1, corrected by the next authoritative
    /// fetch.
    pub fn apply_new_message(
        &mut self,
        chat: Chat,
        is_active: bool,
        live: bool,
    ) -> Vec<ClientAction> {
        let chat_id = chat.id.clone();
        self.replace_chat(chat);

        if is_active {
            let mut actions = self.mark_as_read(&chat_id, live);
            actions.push(ClientAction::ScrollToLatest { chat_id });
            return actions;
        }

        let viewer = self.viewer.clone();
        if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id)
            && let Some(role) = chat.role_of(&viewer)
        {
            *chat.unread_count.get_mut(role) += 1;
            self.total_unread += 1;
        }
        vec![]
    }

    /// Mark a conversation read for the viewer.
    ///
    /// Persists over HTTP, signals other sessions over the realtime channel
    /// (when it is up), unions the viewer into every held message's
    /// `read_by`, zeroes the viewer-role counter, and recomputes the badge.
    /// Idempotent: a second call changes nothing locally.
    pub fn mark_as_read(&mut self, chat_id: &str, live: bool) -> Vec<ClientAction> {
        let viewer = self.viewer.clone();
        let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) else {
            return vec![];
        };

        for message in &mut chat.messages {
            message.mark_read_by(&viewer);
        }
        if let Some(role) = chat.role_of(&viewer) {
            *chat.unread_count.get_mut(role) = 0;
        }
        self.recompute_total();

        let mut actions =
            vec![ClientAction::Http(HttpRequest::PersistRead { chat_id: chat_id.to_owned() })];
        if live {
            actions.push(ClientAction::Emit(ClientMessage::MarkAsRead(chat_id.to_owned())));
        }
        actions
    }

    /// Apply an inbound `messagesRead` relay for the active conversation.
    ///
    /// Unions `user_id` into every message's `read_by` (full-set union: safe
    /// and idempotent even when receipts arrive out of order) and zeroes the
    /// counter of whichever side `user_id` occupies.
    pub fn apply_messages_read(&mut self, chat_id: &str, user_id: &str, is_active: bool) {
        if !is_active {
            return;
        }
        let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) else {
            return;
        };

        for message in &mut chat.messages {
            message.mark_read_by(user_id);
        }
        if let Some(role) = chat.role_of(user_id) {
            *chat.unread_count.get_mut(role) = 0;
        }
        self.recompute_total();
    }

    /// An out-of-room notification always bumps the global badge, regardless
    /// of document focus.
    pub fn apply_notification(&mut self) {
        self.total_unread += 1;
    }

    /// Fetch scheduling: 60 s list refresh always, 3 s active-conversation
    /// poll only while degraded. The two realtime/polling paths are never
    /// concurrently active because `degraded` gates the poll.
    pub fn tick(&mut self, now: I, degraded: bool, active: Option<&ChatId>) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        if self.last_refresh.is_none_or(|t| now - t >= REFRESH_INTERVAL) {
            self.last_refresh = Some(now);
            actions.push(ClientAction::Http(HttpRequest::FetchChats));
        }

        if !degraded {
            self.last_poll = None;
            return actions;
        }

        if let Some(chat_id) = active
            && self.last_poll.is_none_or(|t| now - t >= POLL_INTERVAL)
        {
            self.last_poll = Some(now);
            actions.push(ClientAction::Http(HttpRequest::FetchChat { chat_id: chat_id.clone() }));
        }

        actions
    }

    fn recompute_total(&mut self) {
        self.total_unread = self
            .chats
            .iter()
            .map(|chat| chat.role_of(&self.viewer).map_or(0, |role| chat.unread_count.get(role)))
            .sum();
    }
}
