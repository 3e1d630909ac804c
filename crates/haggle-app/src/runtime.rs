//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: view-model state machine
//! - [`Bridge`]: protocol bridge to the chat client
//! - [`Driver`]: platform-specific I/O
//!
//! All timers live inside the state machines as deadlines, so quitting the
//! loop and closing the transport is a complete teardown: no callback can
//! outlive the runtime.

use haggle_client::{ClientConfig, ClientEvent, Environment, HttpRequest, Identity};

use crate::{
    App, AppAction, AppEvent, Bridge, Driver,
    bridge::UiEffect,
    driver::{HttpOutcome, TransportSignal},
};

/// Ceiling on follow-up I/O rounds within one drain (an HTTP completion may
/// queue another request, e.g. bootstrap → deep-link select → persist read).
const MAX_IO_ROUNDS: usize = 8;

/// Generic runtime that orchestrates App, Bridge, and Driver.
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
    pending_events: Vec<AppEvent>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a new runtime with the given driver, environment, and session
    /// identity.
    pub fn new(driver: D, env: E, identity: Option<Identity>, config: ClientConfig) -> Self {
        let app = App::new();
        let bridge = Bridge::new(env, identity, config);
        Self { driver, app, bridge, pending_events: Vec::new() }
    }

    /// Run the main event loop until the application quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an irrecoverable I/O error
    /// (input source or renderer). Transport and HTTP failures never
    /// propagate here; they feed the state machines.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        let events = self.bridge.start();
        if self.process_events(events).await? {
            self.driver.close_transport();
            return Ok(());
        }

        loop {
            if self.process_cycle().await? {
                break;
            }
        }

        // Exhaustive teardown: disarm every state-machine deadline and drop
        // the socket
        let events = self.bridge.dispatch(ClientEvent::Stop);
        let _ = self.process_events(events).await?;
        self.drain_io().await;
        self.driver.close_transport();
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let carried = std::mem::take(&mut self.pending_events);
        if self.process_events(carried).await? {
            return Ok(true);
        }

        if let Some(action) = self.driver.poll_input().await? {
            if self.process_actions(vec![action]).await? {
                return Ok(true);
            }
        }

        if let Some(signal) = self.driver.poll_transport().await {
            let events = self.dispatch_signal(signal);
            if self.process_events(events).await? {
                return Ok(true);
            }
        }

        let now = self.driver.now();
        let events = self.bridge.dispatch(ClientEvent::Tick { now });
        if self.process_events(events).await? {
            return Ok(true);
        }

        Ok(false)
    }

    fn dispatch_signal(&mut self, signal: TransportSignal) -> Vec<AppEvent> {
        match signal {
            TransportSignal::Connected => self.bridge.dispatch(ClientEvent::TransportConnected),
            TransportSignal::ConnectFailed { reason } => {
                self.bridge.dispatch(ClientEvent::ConnectFailed { reason })
            },
            TransportSignal::Message(msg) => self.bridge.dispatch(ClientEvent::ServerMessage(msg)),
            TransportSignal::Closed => self.bridge.dispatch(ClientEvent::TransportClosed),
        }
    }

    /// Process events from Bridge back to App.
    ///
    /// Returns `true` if should quit.
    async fn process_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Process actions returned by the App, then flush pending I/O.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),

                    // Protocol intents go through the bridge
                    AppAction::SelectChat { .. }
                    | AppAction::SendMessage { .. }
                    | AppAction::Keystroke { .. }
                    | AppAction::CreateChat { .. }
                    | AppAction::FocusChanged { .. }
                    | AppAction::PermissionChanged { .. } => {
                        let events = self.bridge.process_app_action(action);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }

        self.drain_io().await;
        Ok(false)
    }

    /// Execute everything the bridge queued: wire sends, UI effects, HTTP
    /// requests. Completions are dispatched back into the bridge; the App
    /// events they produce are carried into the next cycle.
    async fn drain_io(&mut self) {
        for _ in 0..MAX_IO_ROUNDS {
            let outgoing = self.bridge.take_outgoing();
            let effects = self.bridge.take_effects();
            let requests = self.bridge.take_http();

            if outgoing.is_empty() && effects.is_empty() && requests.is_empty() {
                return;
            }

            for msg in outgoing {
                if let Err(e) = self.driver.send(msg).await {
                    // The Closed signal will arrive and drive the retry loop
                    tracing::warn!(error = %e, "wire send failed");
                }
            }

            for effect in effects {
                self.run_effect(effect).await;
            }

            for request in requests {
                match self.driver.run_http(request.clone()).await {
                    Ok(outcome) => {
                        if let Some(event) = completion_event(request, outcome) {
                            self.pending_events.extend(self.bridge.dispatch(event));
                        }
                    },
                    Err(message) => {
                        let event = ClientEvent::FetchFailed { request, message };
                        self.pending_events.extend(self.bridge.dispatch(event));
                    },
                }
            }
        }

        tracing::warn!("i/o drain did not settle within {MAX_IO_ROUNDS} rounds");
    }

    async fn run_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::OpenTransport => {
                if let Err(e) = self.driver.open_transport().await {
                    let event = ClientEvent::ConnectFailed { reason: e.to_string() };
                    self.pending_events.extend(self.bridge.dispatch(event));
                }
            },
            UiEffect::CloseTransport => self.driver.close_transport(),
            UiEffect::Notify { title, body, image, chat_id } => {
                self.driver.notify(&title, &body, &image, &chat_id);
            },
            UiEffect::PlaySound => self.driver.play_sound(),
            UiEffect::RequestPermission => self.driver.request_permission(),
            UiEffect::UpdateLocation { chat_id } => self.driver.set_location(&chat_id),
            UiEffect::ScrollToLatest { chat_id } => self.driver.scroll_to_latest(&chat_id),
        }
    }

    /// Get a reference to the App.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a reference to the Bridge.
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }
}

/// Pair an HTTP completion with the client event that carries it.
fn completion_event<I>(request: HttpRequest, outcome: HttpOutcome) -> Option<ClientEvent<I>> {
    match (request, outcome) {
        (HttpRequest::FetchChats, HttpOutcome::ChatList(list)) => {
            Some(ClientEvent::ChatListFetched { list })
        },
        (HttpRequest::FetchChat { .. }, HttpOutcome::Chat(chat)) => {
            Some(ClientEvent::ChatFetched { chat })
        },
        (HttpRequest::CreateChat { .. }, HttpOutcome::Created(chat) | HttpOutcome::Chat(chat)) => {
            Some(ClientEvent::ChatCreated { chat })
        },
        (HttpRequest::PersistRead { .. }, _) => None,
        (request, _) => {
            tracing::warn!(?request, "mismatched http outcome; dropping");
            None
        },
    }
}
