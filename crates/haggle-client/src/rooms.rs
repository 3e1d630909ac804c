//! Room membership tracking.
//!
//! Exactly one conversation is active (subscribed) at a time. Switching is a
//! small choreography: leave the old room, wait briefly for its ack, activate
//! the target, join it, wait briefly for that ack. Both waits are bounded,
//! since a dropped ack must never deadlock a switch, and a re-selection
//! arriving mid-switch supersedes the pending target instead of queueing.
//!
//! The tracker guarantees that at settle time at most one room is joined on
//! the live transport, and that a switch never strands the client with zero
//! active conversations.

use std::{ops::Sub, time::Duration};

use haggle_proto::ChatId;

/// Bounded wait for a `leftChat` ack before proceeding with a switch.
pub const LEAVE_ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Bounded wait for a `joinedChat` ack before assuming membership.
pub const JOIN_ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Effects the tracker asks the client to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEffect {
    /// Emit `leaveChat` for this room.
    Leave(ChatId),

    /// Emit `joinChat` for this room.
    Join(ChatId),

    /// The conversation became the active one. The client follows up with
    /// mark-as-read, the location update, and scroll-to-latest.
    Activated(ChatId),
}

#[derive(Debug, Clone)]
enum SwitchPhase<I> {
    /// `leaveChat` emitted for the previously joined room.
    AwaitingLeave {
        /// Room being left.
        from: ChatId,
        /// When the leave was emitted.
        started: I,
    },
    /// `joinChat` emitted for the target.
    AwaitingJoin {
        /// When the join was emitted.
        started: I,
    },
}

#[derive(Debug, Clone)]
struct PendingSwitch<I> {
    target: ChatId,
    phase: SwitchPhase<I>,
}

/// Membership tracker for the realtime transport's rooms.
///
/// `active` is the conversation the UI shows; `joined` is the room the
/// transport is actually subscribed to. The two converge at settle time but
/// diverge briefly mid-switch and whenever the transport is down.
#[derive(Debug, Clone)]
pub struct RoomTracker<I> {
    active: Option<ChatId>,
    joined: Option<ChatId>,
    pending: Option<PendingSwitch<I>>,
}

impl<I> RoomTracker<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self { active: None, joined: None, pending: None }
    }

    /// The active (UI-selected) conversation.
    pub fn active(&self) -> Option<&ChatId> {
        self.active.as_ref()
    }

    /// The room currently joined on the transport.
    pub fn joined(&self) -> Option<&ChatId> {
        self.joined.as_ref()
    }

    /// Whether a switch choreography is in flight.
    pub fn is_switching(&self) -> bool {
        self.pending.is_some()
    }

    /// Select a conversation.
    ///
    /// `live` is whether the transport is authenticated; without it the
    /// selection is local-only and no room events are emitted.
    /// Selecting the already-active conversation is a no-op.
    pub fn select(&mut self, target: ChatId, live: bool, now: I) -> Vec<RoomEffect> {
        match self.pending.take() {
            Some(pending) if pending.target == target => {
                // Same switch already in flight
                self.pending = Some(pending);
                vec![]
            },
            Some(PendingSwitch { phase: SwitchPhase::AwaitingLeave { from, started }, .. }) => {
                // Supersede: keep waiting for the same leave ack, new target
                self.pending = Some(PendingSwitch {
                    target,
                    phase: SwitchPhase::AwaitingLeave { from, started },
                });
                vec![]
            },
            Some(PendingSwitch { target: prev, phase: SwitchPhase::AwaitingJoin { .. } }) => {
                // A join for `prev` is in flight (or acked); back out of it
                // before activating the new target
                if live {
                    self.pending = Some(PendingSwitch {
                        target,
                        phase: SwitchPhase::AwaitingLeave { from: prev.clone(), started: now },
                    });
                    vec![RoomEffect::Leave(prev)]
                } else {
                    self.activate(target, false, now)
                }
            },
            None => {
                if self.active.as_ref() == Some(&target) {
                    return vec![];
                }
                match &self.joined {
                    Some(joined) if live && *joined != target => {
                        let from = joined.clone();
                        self.pending = Some(PendingSwitch {
                            target,
                            phase: SwitchPhase::AwaitingLeave { from: from.clone(), started: now },
                        });
                        vec![RoomEffect::Leave(from)]
                    },
                    _ => self.activate(target, live, now),
                }
            },
        }
    }

    /// Ack of a `leaveChat`. Best-effort: a switch proceeds on timeout even
    /// if this never arrives.
    pub fn handle_left_ack(&mut self, chat_id: &str, live: bool, now: I) -> Vec<RoomEffect> {
        match self.pending.take() {
            Some(PendingSwitch { target, phase: SwitchPhase::AwaitingLeave { from, .. } })
                if from == chat_id =>
            {
                self.joined = None;
                self.activate(target, live, now)
            },
            other => {
                self.pending = other;
                // Unsolicited ack (e.g. the timeout already fired): the room
                // is simply no longer joined
                if self.joined.as_deref() == Some(chat_id) {
                    self.joined = None;
                }
                vec![]
            },
        }
    }

    /// Ack of a `joinChat`.
    pub fn handle_joined_ack(&mut self, chat_id: &str) {
        if let Some(PendingSwitch { target, phase: SwitchPhase::AwaitingJoin { .. } }) =
            &self.pending
            && target == chat_id
        {
            self.joined = Some(target.clone());
            self.pending = None;
        }
    }

    /// Resolve bounded ack waits whose deadline has passed.
    pub fn tick(&mut self, live: bool, now: I) -> Vec<RoomEffect> {
        match &self.pending {
            Some(PendingSwitch { target, phase: SwitchPhase::AwaitingLeave { started, .. } })
                if now - *started >= LEAVE_ACK_TIMEOUT =>
            {
                // Ack was dropped; proceed regardless to avoid deadlock
                let target = target.clone();
                self.pending = None;
                self.joined = None;
                self.activate(target, live, now)
            },
            Some(PendingSwitch { target, phase: SwitchPhase::AwaitingJoin { started } })
                if now - *started >= JOIN_ACK_TIMEOUT =>
            {
                // Join is assumed idempotent server-side; treat as member
                self.joined = Some(target.clone());
                self.pending = None;
                vec![]
            },
            _ => vec![],
        }
    }

    /// The transport dropped: no room survives a reconnect. A switch in
    /// flight settles locally so the user still lands on the target.
    pub fn handle_transport_down(&mut self) -> Vec<RoomEffect> {
        self.joined = None;
        match self.pending.take() {
            Some(PendingSwitch { target, .. }) => {
                self.active = Some(target.clone());
                vec![RoomEffect::Activated(target)]
            },
            None => vec![],
        }
    }

    /// The transport (re)authenticated: re-join the active conversation,
    /// since server-side membership did not survive the reconnect.
    pub fn handle_authenticated(&mut self, now: I) -> Vec<RoomEffect> {
        match &self.active {
            Some(active) if self.pending.is_none() => {
                let target = active.clone();
                self.pending = Some(PendingSwitch {
                    target: target.clone(),
                    phase: SwitchPhase::AwaitingJoin { started: now },
                });
                vec![RoomEffect::Join(target)]
            },
            _ => vec![],
        }
    }

    /// Forget everything (teardown).
    pub fn reset(&mut self) {
        self.active = None;
        self.joined = None;
        self.pending = None;
    }

    fn activate(&mut self, target: ChatId, live: bool, now: I) -> Vec<RoomEffect> {
        self.active = Some(target.clone());

        if !live {
            self.pending = None;
            return vec![RoomEffect::Activated(target)];
        }

        if self.joined.as_ref() == Some(&target) {
            // Already a member (e.g. switched away and back before the leave
            // was emitted)
            self.pending = None;
            return vec![RoomEffect::Activated(target)];
        }

        self.pending = Some(PendingSwitch {
            target: target.clone(),
            phase: SwitchPhase::AwaitingJoin { started: now },
        });
        vec![RoomEffect::Activated(target.clone()), RoomEffect::Join(target)]
    }
}

impl<I> Default for RoomTracker<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new()
    }
}
