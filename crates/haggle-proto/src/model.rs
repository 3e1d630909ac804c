//! Conversation data model.
//!
//! A [`Chat`] is a buyer–seller thread anchored to one [`Product`]. The server
//! is authoritative for message lists; clients treat `messages` as append-only
//! and `read_by` as a grow-only set. Unread counters are tracked per role so
//! both sides of a thread can badge independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque server-issued user identifier.
pub type UserId = String;

/// Opaque server-issued conversation identifier, stable across reconnects.
pub type ChatId = String;

/// Which side of a conversation a user occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// The purchasing side of the thread.
    Buyer,
    /// The side that listed the product.
    Seller,
}

impl Role {
    /// The opposite side of the thread.
    pub fn counterpart(self) -> Self {
        match self {
            Self::Buyer => Self::Seller,
            Self::Seller => Self::Buyer,
        }
    }
}

/// A chat participant descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Server-issued user id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL, if the user uploaded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// The commerce context a conversation is anchored to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Server-issued product id.
    pub id: String,
    /// Listing title.
    pub name: String,
    /// Primary listing image URL.
    pub image: String,
    /// Listing price, display-only on the client.
    pub price: f64,
}

/// A single message in a conversation.
///
/// Messages are never removed or reordered after being appended, and
/// `read_by` only ever grows (union semantics, even when receipts arrive out
/// of order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// User id of the author. Ownership is derived by comparing against the
    /// locally known viewer id, not carried as a role tag.
    pub sender: UserId,
    /// Message text.
    pub content: String,
    /// Server-assigned creation time, immutable.
    pub created_at: DateTime<Utc>,
    /// Ids of users who have read this message.
    #[serde(default)]
    pub read_by: Vec<UserId>,
}

impl Message {
    /// Whether `user` has read this message.
    pub fn is_read_by(&self, user: &str) -> bool {
        self.read_by.iter().any(|id| id == user)
    }

    /// Add `user` to the read set. Idempotent; the set never shrinks.
    pub fn mark_read_by(&mut self, user: &str) {
        if !self.is_read_by(user) {
            self.read_by.push(user.to_owned());
        }
    }
}

/// Per-role unread counters.
///
/// Exactly one of the two pertains to the local viewer, determined by whether
/// the viewer id equals `Chat::buyer.id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    /// Messages the buyer has not read.
    pub buyer: u32,
    /// Messages the seller has not read.
    pub seller: u32,
}

impl UnreadCount {
    /// Counter for the given role.
    pub fn get(&self, role: Role) -> u32 {
        match role {
            Role::Buyer => self.buyer,
            Role::Seller => self.seller,
        }
    }

    /// Mutable counter for the given role.
    pub fn get_mut(&mut self, role: Role) -> &mut u32 {
        match role {
            Role::Buyer => &mut self.buyer,
            Role::Seller => &mut self.seller,
        }
    }
}

/// A buyer–seller conversation anchored to one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Server-issued conversation id, stable across reconnects.
    pub id: ChatId,
    /// The purchasing participant.
    pub buyer: Participant,
    /// The listing participant.
    pub seller: Participant,
    /// The product this thread is about.
    pub product: Product,
    /// Chronologically ordered messages, append-only.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Per-role unread counters.
    #[serde(default)]
    pub unread_count: UnreadCount,
}

impl Chat {
    /// Which side of this conversation `user` occupies. `None` for
    /// third parties.
    pub fn role_of(&self, user: &str) -> Option<Role> {
        if self.buyer.id == user {
            Some(Role::Buyer)
        } else if self.seller.id == user {
            Some(Role::Seller)
        } else {
            None
        }
    }

    /// The participant occupying `role`.
    pub fn participant(&self, role: Role) -> &Participant {
        match role {
            Role::Buyer => &self.buyer,
            Role::Seller => &self.seller,
        }
    }

    /// The participant opposite `role`.
    pub fn counterpart(&self, role: Role) -> &Participant {
        self.participant(role.counterpart())
    }

    /// Whether any messages exist in this thread.
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }
}
