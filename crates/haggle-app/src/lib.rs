//! Application layer for the Haggle chat widget.
//!
//! Pure state machines and a generic runtime for UI and protocol
//! orchestration. The same code drives a real frontend and the in-memory
//! test drivers.
//!
//! # Components
//!
//! - [`App`]: view-model state machine (rows, selection, banner, badge)
//! - [`Bridge`]: protocol bridge (translates App intents to Client events
//!   and Client actions back to App events)
//! - [`Driver`]: trait for platform-specific I/O abstraction
//! - [`Runtime`]: generic orchestration loop using Driver
//!
//! The App/Bridge event channel is the explicit, typed replacement for the
//! window-global event bus the original storefront leaned on: cross-component
//! signals travel as [`AppEvent`] values through owned channels, never as
//! ambient global dispatch.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use bridge::{Bridge, UiEffect};
pub use driver::{Driver, HttpOutcome, TransportSignal};
pub use event::AppEvent;
pub use runtime::Runtime;
pub use state::ChatRow;
