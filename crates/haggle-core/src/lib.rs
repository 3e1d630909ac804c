//! Core building blocks for the Haggle chat engine.
//!
//! Provides the [`env::Environment`] abstraction (time without I/O, for
//! deterministic tests) and the connection lifecycle state machine that the
//! chat client builds on.
//!
//! Everything here is Sans-IO: state machines consume events plus explicit
//! instants and return actions for a driver to execute. No sockets, no
//! timers, no globals.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;

pub use connection::{
    AccountRole, Connection, ConnectionAction, ConnectionConfig, ConnectionError, ConnectionState,
    Identity,
};
