//! Presence and typing indicators.
//!
//! Presence is a plain set of online user ids, replaced wholesale by
//! snapshots and patched by deltas. Typing is advisory UI state: inbound
//! events key a map by conversation, outbound emission is debounced so a
//! burst of keystrokes costs one network event. Losing any of this never
//! corrupts message integrity, so everything here is dropped on disconnect.

use std::{
    collections::{HashMap, HashSet},
    ops::Sub,
    time::Duration,
};

use haggle_proto::{ChatId, UserId};

/// Idle time after the last keystroke before the outbound typing state
/// clears and the next keystroke re-emits.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
struct OutboundTyping<I> {
    chat_id: ChatId,
    last_keystroke: I,
}

/// Tracker for who is online and who is typing where.
#[derive(Debug, Clone)]
pub struct PresenceTracker<I> {
    online: HashSet<UserId>,
    typing: HashMap<ChatId, UserId>,
    outbound: Option<OutboundTyping<I>>,
}

impl<I> PresenceTracker<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self { online: HashSet::new(), typing: HashMap::new(), outbound: None }
    }

    /// Whether `user` currently has a live connection.
    pub fn is_online(&self, user: &str) -> bool {
        self.online.contains(user)
    }

    /// The set of online user ids.
    pub fn online(&self) -> &HashSet<UserId> {
        &self.online
    }

    /// Who is typing in `chat_id`, if anyone. At most one typist is tracked
    /// per conversation.
    pub fn typist(&self, chat_id: &str) -> Option<&UserId> {
        self.typing.get(chat_id)
    }

    /// Replace the whole presence set with a server snapshot.
    pub fn apply_snapshot(&mut self, users: Vec<UserId>) {
        self.online = users.into_iter().collect();
    }

    /// Apply a single-user presence delta.
    pub fn apply_status(&mut self, user_id: UserId, is_online: bool) {
        if is_online {
            self.online.insert(user_id);
        } else {
            self.online.remove(&user_id);
        }
    }

    /// Record a local keystroke in `chat_id`.
    ///
    /// Returns `true` when an outbound typing event should be emitted: on the
    /// first keystroke of a burst, or when the composer moved to a different
    /// conversation. Further keystrokes only refresh the idle deadline
    /// (debounce, not heartbeat).
    pub fn keystroke(&mut self, chat_id: &str, now: I) -> bool {
        match &mut self.outbound {
            Some(outbound) if outbound.chat_id == chat_id => {
                outbound.last_keystroke = now;
                false
            },
            _ => {
                self.outbound =
                    Some(OutboundTyping { chat_id: chat_id.to_owned(), last_keystroke: now });
                true
            },
        }
    }

    /// A message was sent in `chat_id`; the burst is over.
    pub fn message_sent(&mut self, chat_id: &str) {
        if self.outbound.as_ref().is_some_and(|o| o.chat_id == chat_id) {
            self.outbound = None;
        }
    }

    /// Clear the outbound typing state once the idle timeout elapses.
    pub fn tick(&mut self, now: I) {
        if self
            .outbound
            .as_ref()
            .is_some_and(|o| now - o.last_keystroke >= TYPING_IDLE_TIMEOUT)
        {
            self.outbound = None;
        }
    }

    /// Inbound: `user_id` started typing in `chat_id`.
    pub fn handle_user_typing(&mut self, chat_id: ChatId, user_id: UserId) {
        self.typing.insert(chat_id, user_id);
    }

    /// Inbound: `user_id` stopped typing in `chat_id`. Only clears the
    /// matching (chat, user) pair.
    pub fn handle_user_stopped_typing(&mut self, chat_id: &str, user_id: &str) {
        if self.typing.get(chat_id).is_some_and(|typist| typist == user_id) {
            self.typing.remove(chat_id);
        }
    }

    /// A message arrived in `chat_id`: implicit stopped-typing for its
    /// typist, since the explicit stop event may have been lost.
    pub fn message_arrived(&mut self, chat_id: &str) {
        self.typing.remove(chat_id);
    }

    /// Drop all advisory state (transport down or teardown).
    pub fn reset(&mut self) {
        self.online.clear();
        self.typing.clear();
        self.outbound = None;
    }
}

impl<I> Default for PresenceTracker<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn snapshot_replaces_entire_set() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        presence.apply_status("stale".into(), true);

        presence.apply_snapshot(vec!["u1".into(), "u2".into()]);
        assert!(presence.is_online("u1"));
        assert!(presence.is_online("u2"));
        assert!(!presence.is_online("stale"));
    }

    #[test]
    fn status_delta_adds_and_removes_one_id() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        presence.apply_status("u1".into(), true);
        assert!(presence.is_online("u1"));
        presence.apply_status("u1".into(), false);
        assert!(!presence.is_online("u1"));
    }

    #[test]
    fn keystroke_burst_emits_once() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        let t0 = Instant::now();

        assert!(presence.keystroke("c1", t0));
        for i in 1..10u64 {
            assert!(!presence.keystroke("c1", t0 + Duration::from_millis(i * 50)));
        }
    }

    #[test]
    fn idle_timeout_rearms_emission() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        let t0 = Instant::now();

        assert!(presence.keystroke("c1", t0));
        presence.tick(t0 + Duration::from_secs(1));
        assert!(!presence.keystroke("c1", t0 + Duration::from_secs(1)));

        // 3 seconds after the last keystroke the state clears
        presence.tick(t0 + Duration::from_secs(4));
        assert!(presence.keystroke("c1", t0 + Duration::from_secs(4)));
    }

    #[test]
    fn switching_composer_reemits_for_new_chat() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        let t0 = Instant::now();

        assert!(presence.keystroke("c1", t0));
        assert!(presence.keystroke("c2", t0));
    }

    #[test]
    fn sending_ends_the_burst() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        let t0 = Instant::now();

        presence.keystroke("c1", t0);
        presence.message_sent("c1");
        assert!(presence.keystroke("c1", t0));
    }

    #[test]
    fn stopped_typing_only_clears_matching_pair() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        presence.handle_user_typing("c1".into(), "u1".into());

        presence.handle_user_stopped_typing("c1", "u2");
        assert_eq!(presence.typist("c1"), Some(&"u1".to_owned()));

        presence.handle_user_stopped_typing("c1", "u1");
        assert_eq!(presence.typist("c1"), None);
    }

    #[test]
    fn arriving_message_clears_typist() {
        let mut presence: PresenceTracker<Instant> = PresenceTracker::new();
        presence.handle_user_typing("c1".into(), "u1".into());
        presence.message_arrived("c1");
        assert_eq!(presence.typist("c1"), None);
    }
}
