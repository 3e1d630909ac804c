//! Desktop notification and sound dispatch.
//!
//! Cosmetic by contract: everything here is best-effort. Permission is
//! requested lazily, exactly once per session, and only while undecided.
//! Notifications are suppressed when the document has focus (the user is
//! already looking at the page); the sound plays either way, with playback
//! failures swallowed by the driver.

use haggle_proto::{
    ChatId,
    model::{Participant, Product},
};

use crate::event::ClientAction;

/// Maximum preview length before the message body is truncated.
pub const PREVIEW_LEN: usize = 50;

/// Desktop notification permission as the driver reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Never asked this session.
    Undecided,
    /// Request emitted, outcome not yet reported.
    Requested,
    /// User granted notifications.
    Granted,
    /// User denied notifications; never ask again this session.
    Denied,
}

/// Notification dispatcher state.
#[derive(Debug, Clone)]
pub struct Notifier {
    permission: Permission,
    focused: bool,
}

impl Notifier {
    /// Create a dispatcher; documents start focused.
    pub fn new() -> Self {
        Self { permission: Permission::Undecided, focused: true }
    }

    /// Current permission state.
    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Record a document focus change.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Record the outcome of a permission request.
    pub fn set_permission(&mut self, granted: bool) {
        self.permission = if granted { Permission::Granted } else { Permission::Denied };
    }

    /// Dispatch an out-of-room message notification.
    ///
    /// The global badge increment happens in the store, not here, so it
    /// applies regardless of focus or permission.
    pub fn handle_notification(
        &mut self,
        sender: &Participant,
        message: &str,
        product: &Product,
        chat_id: &ChatId,
    ) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        if self.permission == Permission::Undecided {
            self.permission = Permission::Requested;
            actions.push(ClientAction::RequestNotificationPermission);
        }

        if !self.focused && self.permission == Permission::Granted {
            actions.push(ClientAction::Notify {
                title: sender.name.clone(),
                body: preview(message),
                image: product.image.clone(),
                chat_id: chat_id.clone(),
            });
        }

        actions.push(ClientAction::PlaySound);
        actions
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// First [`PREVIEW_LEN`] characters of the message, with an ellipsis when
/// truncated. Counts characters, not bytes, so multi-byte text never splits.
fn preview(message: &str) -> String {
    if message.chars().count() <= PREVIEW_LEN {
        return message.to_owned();
    }
    let mut body: String = message.chars().take(PREVIEW_LEN).collect();
    body.push_str("...");
    body
}
