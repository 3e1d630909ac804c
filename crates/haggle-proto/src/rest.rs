//! Payloads for the HTTP collaborator.
//!
//! The REST API seeds the store on mount and backstops the realtime channel:
//!
//! - `GET /api/chat` → [`ChatList`]
//! - `GET /api/chat/:id` → [`crate::Chat`] (degraded-mode polling)
//! - `PUT /api/chat/:id/read` → empty ack (persisted read receipt)
//! - `POST /api/chat` with [`CreateChat`] → [`crate::Chat`] (create-or-find
//!   the thread for a product)

use serde::{Deserialize, Serialize};

use crate::model::Chat;

/// Response of `GET /api/chat`: every conversation the viewer participates
/// in, plus the precomputed total unread badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatList {
    /// Conversations in server order.
    pub chats: Vec<Chat>,
    /// Sum of the viewer-role unread counters across all conversations.
    #[serde(default)]
    pub total_unread: u32,
}

/// Request body of `POST /api/chat`.
///
/// The server creates the buyer→seller thread for the product, or returns the
/// existing one (the operation is idempotent per (viewer, product) pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChat {
    /// Product to open a thread about.
    pub product_id: String,
}
