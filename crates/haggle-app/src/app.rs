//! Application view-model state machine.
//!
//! [`App`] tracks what the chat widget shows: the conversation rows, the
//! selection, the unread badge, the connection status line, and the error
//! banner. It is a pure state machine that consumes [`AppEvent`] inputs and
//! produces [`AppAction`] instructions for the runtime to execute, so the
//! same code runs in production and in tests.
//!
//! Protocol state lives in the client; everything here is a render
//! projection replaced wholesale on update.

use haggle_client::ConnectionState;
use haggle_proto::ChatId;

use crate::{AppAction, AppEvent, state::ChatRow};

/// Application view-model state machine.
#[derive(Debug, Clone)]
pub struct App {
    rows: Vec<ChatRow>,
    selected: Option<ChatId>,
    unread_badge: u32,
    connection: ConnectionState,
    status_line: Option<String>,
    error_banner: Option<String>,
}

impl App {
    /// Create an empty view-model.
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            selected: None,
            unread_badge: 0,
            connection: ConnectionState::Disconnected,
            status_line: None,
            error_banner: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Tick => vec![],
            AppEvent::RowsUpdated { rows, unread_badge } => {
                self.rows = rows;
                self.unread_badge = unread_badge;
                vec![AppAction::Render]
            },
            AppEvent::Selected { chat_id } => {
                self.selected = Some(chat_id);
                vec![AppAction::Render]
            },
            AppEvent::ConnectionChanged { state, status } => {
                self.connection = state;
                self.status_line = status;
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.error_banner = Some(message);
                vec![AppAction::Render]
            },
        }
    }

    /// User clicked a conversation.
    pub fn select_chat(&self, chat_id: ChatId) -> Vec<AppAction> {
        vec![AppAction::SelectChat { chat_id }, AppAction::Render]
    }

    /// User submitted the composer.
    pub fn send_message(&self, chat_id: ChatId, content: String) -> Vec<AppAction> {
        vec![AppAction::SendMessage { chat_id, content }, AppAction::Render]
    }

    /// User typed in the composer.
    pub fn compose_keystroke(&self, chat_id: ChatId) -> Vec<AppAction> {
        vec![AppAction::Keystroke { chat_id }]
    }

    /// User clicked "message the seller" on a product.
    pub fn create_chat(&self, product_id: String) -> Vec<AppAction> {
        vec![AppAction::CreateChat { product_id }, AppAction::Render]
    }

    /// User dismissed the error banner.
    pub fn dismiss_banner(&mut self) -> Vec<AppAction> {
        self.error_banner = None;
        vec![AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Conversation rows, in server order.
    pub fn rows(&self) -> &[ChatRow] {
        &self.rows
    }

    /// Currently selected conversation. `None` before the first selection.
    pub fn selected(&self) -> Option<&ChatId> {
        self.selected.as_ref()
    }

    /// Total unread badge.
    pub fn unread_badge(&self) -> u32 {
        self.unread_badge
    }

    /// Connection state for the status indicator.
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Status line, if any ("attempting to reconnect (2/5)").
    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    /// Dismissable error banner, if any.
    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, unread: u32) -> ChatRow {
        ChatRow {
            chat_id: id.into(),
            counterpart: "Grace".into(),
            product: "Walnut desk".into(),
            unread,
            online: false,
            typing: false,
            preview: None,
        }
    }

    #[test]
    fn rows_update_replaces_wholesale() {
        let mut app = App::new();
        let _ = app.handle(AppEvent::RowsUpdated { rows: vec![row("a", 1)], unread_badge: 1 });
        let _ = app.handle(AppEvent::RowsUpdated { rows: vec![row("b", 0)], unread_badge: 0 });

        assert_eq!(app.rows().len(), 1);
        assert_eq!(app.rows()[0].chat_id, "b");
        assert_eq!(app.unread_badge(), 0);
    }

    #[test]
    fn error_banner_sticks_until_dismissed() {
        let mut app = App::new();
        let _ = app.handle(AppEvent::Error { message: "failed to load conversations".into() });
        assert_eq!(app.error_banner(), Some("failed to load conversations"));

        // Unrelated updates keep the banner visible
        let _ = app.handle(AppEvent::RowsUpdated { rows: vec![], unread_badge: 0 });
        assert!(app.error_banner().is_some());

        let actions = app.dismiss_banner();
        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.error_banner(), None);
    }

    #[test]
    fn api_select_chat() {
        let app = App::new();
        let actions = app.select_chat("c1".into());
        assert!(matches!(actions.as_slice(), [
            AppAction::SelectChat { .. },
            AppAction::Render
        ]));
    }

    #[test]
    fn api_send_message() {
        let app = App::new();
        let actions = app.send_message("c1".into(), "hi".into());
        assert!(matches!(actions.as_slice(), [
            AppAction::SendMessage { .. },
            AppAction::Render
        ]));
    }

    #[test]
    fn keystrokes_do_not_force_a_render() {
        let app = App::new();
        assert_eq!(app.compose_keystroke("c1".into()), vec![AppAction::Keystroke {
            chat_id: "c1".into()
        }]);
    }

    #[test]
    fn connection_change_updates_status_line() {
        let mut app = App::new();
        let _ = app.handle(AppEvent::ConnectionChanged {
            state: ConnectionState::Disconnected,
            status: Some("attempting to reconnect (2/5)".into()),
        });
        assert_eq!(app.status_line(), Some("attempting to reconnect (2/5)"));
        assert_eq!(app.connection(), ConnectionState::Disconnected);
    }
}
