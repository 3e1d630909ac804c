//! Chat client state machine for the Haggle storefront.
//!
//! The [`Client`] is the top-level state machine behind the buyer/seller chat
//! widget: it owns the connection lifecycle, room membership choreography,
//! presence and typing indicators, the conversation store with unread/read
//! receipt reconciliation, and notification dispatch.
//!
//! # Architecture
//!
//! Sans-IO and action-based, like [`haggle_core`]: the client receives events
//! ([`ClientEvent`]), processes them through pure state machine logic, and
//! returns actions ([`ClientAction`]) for the caller to execute. Timers are
//! deadlines resolved on [`ClientEvent::Tick`], so teardown cannot leak a
//! callback.
//!
//! # Components
//!
//! - [`Client`]: top-level state machine composing the trackers below
//! - [`rooms::RoomTracker`]: at-most-one-active room membership
//! - [`presence::PresenceTracker`]: presence set, typing map, typing debounce
//! - [`store::ChatStore`]: conversation list, unread counters, read receipts
//! - [`notify::Notifier`]: desktop notification and sound dispatch
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: WebSocket transport task with channel handles
//! - [`rest::RestClient`]: the HTTP collaborator (bootstrap, polling, read
//!   receipts, create-or-find chat)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;

pub mod notify;
pub mod presence;
pub mod rooms;
pub mod store;

#[cfg(feature = "transport")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ClientConfig};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, HttpRequest};
pub use haggle_core::{
    connection::{AccountRole, ConnectionError, ConnectionState, Identity},
    env::Environment,
};
