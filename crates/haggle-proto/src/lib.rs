//! Wire protocol for the Haggle storefront chat.
//!
//! The realtime channel carries adjacently-tagged JSON text frames
//! (`{"event": "...", "data": ...}`), camelCase on the wire because the server
//! is a JavaScript API. The REST collaborator shares the same data model.
//!
//! # Components
//!
//! - [`model`]: conversations, messages, participants, products
//! - [`events`]: [`ClientMessage`] (outbound) and [`ServerMessage`] (inbound)
//! - [`rest`]: request/response payloads for the HTTP collaborator
//!
//! # Invariants
//!
//! Each event variant maps to exactly one wire event name. Round-trip encoding
//! must produce equivalent values. Decoding never panics; malformed input is a
//! [`ProtocolError`] for the transport layer to log and skip.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod events;
pub mod model;
pub mod rest;

mod error;

pub use error::ProtocolError;
pub use events::{ClientMessage, ServerMessage};
pub use model::{Chat, ChatId, Message, Participant, Product, Role, UnreadCount, UserId};
