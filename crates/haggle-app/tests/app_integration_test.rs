//! Integration tests for App and Bridge behavior.
//!
//! Tests run the two state machines against each other the way the Runtime
//! does: App actions through the Bridge, Bridge events back into the App,
//! ending with oracle checks on the view-model and the queued I/O.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::Utc;
use haggle_app::{App, AppAction, Bridge, UiEffect};
use haggle_client::{
    AccountRole, ClientConfig, ClientEvent, ConnectionState, HttpRequest, Identity,
};
use haggle_core::env::test_utils::MockEnv;
use haggle_core::env::Environment;
use haggle_proto::{
    ClientMessage, ServerMessage,
    model::{Chat, Message, Participant, Product, UnreadCount},
    rest::ChatList,
};

fn identity() -> Identity {
    Identity { token: "tok".into(), user_id: "buyer".into(), role: AccountRole::Buyer }
}

fn chat(id: &str, unread_buyer: u32) -> Chat {
    Chat {
        id: id.into(),
        buyer: Participant { id: "buyer".into(), name: "Ada".into(), profile_image: None },
        seller: Participant { id: "seller".into(), name: "Grace".into(), profile_image: None },
        product: Product {
            id: "p1".into(),
            name: "Walnut desk".into(),
            image: "desk.jpg".into(),
            price: 249.0,
        },
        messages: vec![Message {
            sender: "seller".into(),
            content: "hello there".into(),
            created_at: Utc::now(),
            read_by: vec!["seller".into()],
        }],
        unread_count: UnreadCount { buyer: unread_buyer, seller: 0 },
    }
}

/// Feed Bridge events into the App, then resolve any follow-up intents.
fn pump(app: &mut App, bridge: &mut Bridge<MockEnv>, events: Vec<haggle_app::AppEvent>) {
    let mut pending: Vec<AppAction> = Vec::new();
    for event in events {
        pending.extend(app.handle(event));
    }
    while !pending.is_empty() {
        for action in std::mem::take(&mut pending) {
            match action {
                AppAction::Render | AppAction::Quit => {},
                other => {
                    for event in bridge.process_app_action(other) {
                        pending.extend(app.handle(event));
                    }
                },
            }
        }
    }
}

fn connected_pair(chats: Vec<Chat>, total_unread: u32) -> (MockEnv, App, Bridge<MockEnv>) {
    let env = MockEnv::new();
    let mut app = App::new();
    let mut bridge = Bridge::new(env.clone(), Some(identity()), ClientConfig::default());

    let events = bridge.start();
    pump(&mut app, &mut bridge, events);

    let events = bridge.dispatch(ClientEvent::ChatListFetched {
        list: ChatList { chats, total_unread },
    });
    pump(&mut app, &mut bridge, events);

    let events = bridge.dispatch(ClientEvent::TransportConnected);
    pump(&mut app, &mut bridge, events);
    let events = bridge.dispatch(ClientEvent::ServerMessage(ServerMessage::Authenticated {
        success: true,
        user_id: Some("buyer".into()),
        error: None,
    }));
    pump(&mut app, &mut bridge, events);

    (env, app, bridge)
}

#[test]
fn full_flow_select_and_send() {
    let (_env, mut app, mut bridge) = connected_pair(vec![chat("c1", 2)], 2);
    assert_eq!(app.unread_badge(), 2);
    assert_eq!(app.rows().len(), 1);

    // Select the conversation
    let actions = app.select_chat("c1".into());
    let mut events = Vec::new();
    for action in actions {
        if !matches!(action, AppAction::Render) {
            events.extend(bridge.process_app_action(action));
        }
    }
    pump(&mut app, &mut bridge, events);

    assert_eq!(app.selected(), Some(&"c1".to_owned()));
    // Selecting read the conversation: badge cleared, row cleared
    assert_eq!(app.unread_badge(), 0);
    assert_eq!(app.rows()[0].unread, 0);

    let outgoing = bridge.take_outgoing();
    assert!(outgoing.contains(&ClientMessage::MarkAsRead("c1".into())));
    assert!(outgoing.contains(&ClientMessage::JoinChat("c1".into())));
    assert!(bridge.take_http().contains(&HttpRequest::PersistRead { chat_id: "c1".into() }));
    assert!(bridge.take_effects().iter().any(|e| matches!(
        e,
        UiEffect::UpdateLocation { chat_id } if chat_id == "c1"
    )));

    // Send a message
    let events = bridge.process_app_action(AppAction::SendMessage {
        chat_id: "c1".into(),
        content: "is it still available?".into(),
    });
    pump(&mut app, &mut bridge, events);

    assert_eq!(bridge.take_outgoing(), vec![ClientMessage::SendMessage {
        chat_id: "c1".into(),
        content: "is it still available?".into(),
    }]);
    assert_eq!(app.error_banner(), None);
}

#[test]
fn send_while_offline_surfaces_retryable_banner() {
    let env = MockEnv::new();
    let mut app = App::new();
    let mut bridge = Bridge::new(env, Some(identity()), ClientConfig::default());
    let events = bridge.start();
    pump(&mut app, &mut bridge, events);
    let events = bridge.dispatch(ClientEvent::ChatListFetched {
        list: ChatList { chats: vec![chat("c1", 0)], total_unread: 0 },
    });
    pump(&mut app, &mut bridge, events);

    let events = bridge.process_app_action(AppAction::SendMessage {
        chat_id: "c1".into(),
        content: "hello?".into(),
    });
    pump(&mut app, &mut bridge, events);

    assert!(app.error_banner().is_some());
    assert!(bridge.take_outgoing().is_empty());
}

#[test]
fn reconnect_status_reaches_the_view() {
    let env = MockEnv::new();
    let mut app = App::new();
    let mut bridge = Bridge::new(env.clone(), Some(identity()), ClientConfig::default());
    let events = bridge.start();
    pump(&mut app, &mut bridge, events);

    let events = bridge.dispatch(ClientEvent::ConnectFailed { reason: "refused".into() });
    pump(&mut app, &mut bridge, events);

    assert_eq!(app.connection(), ConnectionState::Disconnected);
    assert_eq!(app.status_line(), Some("attempting to reconnect (1/5)"));
}

#[test]
fn degraded_mode_banner_and_poll_queue() {
    let env = MockEnv::new();
    let mut app = App::new();
    let mut bridge = Bridge::new(env.clone(), Some(identity()), ClientConfig::default());
    let events = bridge.start();
    pump(&mut app, &mut bridge, events);
    let events = bridge.dispatch(ClientEvent::ChatListFetched {
        list: ChatList { chats: vec![chat("c1", 0)], total_unread: 0 },
    });
    pump(&mut app, &mut bridge, events);
    let _ = bridge.take_effects();

    for _ in 0..5 {
        let events = bridge.dispatch(ClientEvent::ConnectFailed { reason: "refused".into() });
        pump(&mut app, &mut bridge, events);
        env.advance(Duration::from_secs(2));
        let events = bridge.dispatch(ClientEvent::Tick { now: env.now() });
        pump(&mut app, &mut bridge, events);
    }

    assert_eq!(app.connection(), ConnectionState::DegradedPolling);
    assert!(app.error_banner().unwrap().contains("falling back to periodic refresh"));

    // Select while degraded: no dial, no room events, polling takes over
    let events = bridge.process_app_action(AppAction::SelectChat { chat_id: "c1".into() });
    pump(&mut app, &mut bridge, events);
    assert!(bridge.take_outgoing().is_empty());

    env.advance(Duration::from_secs(3));
    let _ = bridge.take_http();
    let events = bridge.dispatch(ClientEvent::Tick { now: env.now() });
    pump(&mut app, &mut bridge, events);
    assert!(bridge.take_http().contains(&HttpRequest::FetchChat { chat_id: "c1".into() }));
}

#[test]
fn inbound_push_updates_rows_and_badge() {
    let (_env, mut app, mut bridge) = connected_pair(
        vec![chat("c1", 0), chat("c2", 0)],
        0,
    );

    // Viewing c1; a message lands in c2
    let events = bridge.process_app_action(AppAction::SelectChat { chat_id: "c1".into() });
    pump(&mut app, &mut bridge, events);

    let mut pushed = chat("c2", 0);
    pushed.messages.push(Message {
        sender: "seller".into(),
        content: "price dropped".into(),
        created_at: Utc::now(),
        read_by: vec!["seller".into()],
    });
    let events = bridge.dispatch(ClientEvent::ServerMessage(ServerMessage::NewMessage {
        chat: pushed,
    }));
    pump(&mut app, &mut bridge, events);

    assert_eq!(app.unread_badge(), 1);
    let row = app.rows().iter().find(|r| r.chat_id == "c2").unwrap();
    assert_eq!(row.unread, 1);
    assert_eq!(row.preview.as_deref(), Some("price dropped"));
}

#[test]
fn typing_relay_shows_in_rows() {
    let (_env, mut app, mut bridge) = connected_pair(vec![chat("c1", 0)], 0);

    let events = bridge.dispatch(ClientEvent::ServerMessage(ServerMessage::UserTyping {
        chat_id: "c1".into(),
        user_id: "seller".into(),
    }));
    pump(&mut app, &mut bridge, events);
    assert!(app.rows()[0].typing);

    let events = bridge.dispatch(ClientEvent::ServerMessage(ServerMessage::UserStoppedTyping {
        chat_id: "c1".into(),
        user_id: "seller".into(),
    }));
    pump(&mut app, &mut bridge, events);
    assert!(!app.rows()[0].typing);
}
