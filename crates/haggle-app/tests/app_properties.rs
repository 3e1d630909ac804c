//! Property-based tests for the App view-model.
//!
//! Verifies that invariants hold under arbitrary event sequences: the
//! view-model only ever reflects the last update it was fed, and transient
//! state (banner, selection) changes only through its designated events.

#![allow(clippy::unwrap_used)]

use haggle_app::{App, AppEvent, ChatRow};
use haggle_client::ConnectionState;
use proptest::prelude::*;

fn row(id: u8, unread: u32) -> ChatRow {
    ChatRow {
        chat_id: format!("c{id}"),
        counterpart: "Grace".into(),
        product: "Walnut desk".into(),
        unread,
        online: false,
        typing: false,
        preview: None,
    }
}

/// Generate random app events.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        1 => Just(AppEvent::Tick),
        3 => (prop::collection::vec((0u8..5, 0u32..4), 0..4)).prop_map(|entries| {
            let rows: Vec<ChatRow> = entries.iter().map(|(id, unread)| row(*id, *unread)).collect();
            let badge = rows.iter().map(|r| r.unread).sum();
            AppEvent::RowsUpdated { rows, unread_badge: badge }
        }),
        2 => (0u8..5).prop_map(|id| AppEvent::Selected { chat_id: format!("c{id}") }),
        1 => Just(AppEvent::ConnectionChanged {
            state: ConnectionState::Connecting,
            status: None,
        }),
        1 => ".{0,12}".prop_map(|message| AppEvent::Error { message }),
    ]
}

proptest! {
    /// The badge always equals the last RowsUpdated emission, and rows are
    /// replaced wholesale: stale rows never linger.
    #[test]
    fn view_reflects_last_rows_update(events in prop::collection::vec(event_strategy(), 0..40)) {
        let mut app = App::new();
        let mut expected_rows: Vec<ChatRow> = Vec::new();
        let mut expected_badge = 0u32;

        for event in events {
            if let AppEvent::RowsUpdated { rows, unread_badge } = &event {
                expected_rows.clone_from(rows);
                expected_badge = *unread_badge;
            }
            let _ = app.handle(event);

            prop_assert_eq!(app.rows(), expected_rows.as_slice());
            prop_assert_eq!(app.unread_badge(), expected_badge);
        }
    }

    /// The selection only moves through Selected events.
    #[test]
    fn selection_only_moves_via_selected_events(
        events in prop::collection::vec(event_strategy(), 0..40)
    ) {
        let mut app = App::new();
        let mut expected: Option<String> = None;

        for event in events {
            if let AppEvent::Selected { chat_id } = &event {
                expected = Some(chat_id.clone());
            }
            let _ = app.handle(event);
            prop_assert_eq!(app.selected(), expected.as_ref());
        }
    }

    /// An error banner survives every event except an explicit dismissal.
    #[test]
    fn banner_persists_until_dismissed(
        events in prop::collection::vec(event_strategy(), 0..30)
    ) {
        let mut app = App::new();
        let _ = app.handle(AppEvent::Error { message: "it broke".into() });

        for event in events {
            let had_banner = app.error_banner().is_some();
            let is_error = matches!(event, AppEvent::Error { .. });
            let _ = app.handle(event);

            if had_banner || is_error {
                prop_assert!(app.error_banner().is_some());
            }
        }

        let _ = app.dismiss_banner();
        prop_assert_eq!(app.error_banner(), None);
    }
}
