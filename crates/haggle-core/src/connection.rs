//! Connection lifecycle state machine.
//!
//! Owns the realtime transport's lifecycle: dialing, the explicit
//! authenticate step after transport-level connect, the fixed-delay retry
//! loop with a bounded attempt count, and the fall-back to degraded polling
//! once retries are exhausted.
//!
//! Uses the action pattern: methods take time as input and return actions for
//! the driver to execute, keeping the state machine pure and testable.
//!
//! # State machine
//!
//! ```text
//! ┌──────────────┐ start  ┌────────────┐ transport up ┌───────────┐ auth ok ┌───────────────┐
//! │ Disconnected │───────>│ Connecting │─────────────>│ Connected │────────>│ Authenticated │
//! └──────────────┘        └────────────┘              └───────────┘         └───────────────┘
//!        ↑ retry timer due       │ dial failed              │ auth failed         │ drop
//!        └───────────────────────┤ (attempts < 5)           ↓                     ↓
//!                                │                    Disconnected          Disconnected
//!                                │ (attempts = 5)     (terminal latch)      (retry armed)
//!                                ↓
//!                        ┌─────────────────┐
//!                        │ DegradedPolling │  terminal; store switches to HTTP refetch
//!                        └─────────────────┘
//! ```
//!
//! Transport events that race a teardown (a close notification arriving after
//! `shutdown`) are ignored rather than treated as protocol violations.

use std::{ops::Sub, time::Duration};

use haggle_proto::UserId;
use thiserror::Error;

/// Dial attempts before giving up on the realtime channel.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Fixed delay between dial attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Coarse account role decoded from the session token.
///
/// UI personalization only. The raw token travels with every privileged call;
/// the server never trusts a client-decoded role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    /// Regular shopper account.
    Buyer,
    /// Storefront seller account.
    Seller,
    /// Marketplace administrator.
    Admin,
}

/// The identity triple required to bring the realtime channel up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque bearer token from session storage, passed through verbatim.
    pub token: String,
    /// Locally known user id, used to tell own messages apart.
    pub user_id: UserId,
    /// Account role hint.
    pub role: AccountRole,
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live transport; a retry may be armed.
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Transport is up, authenticate handshake not yet acknowledged.
    Connected,
    /// Handshake acknowledged; the channel is usable.
    Authenticated,
    /// Retries exhausted; the store polls over HTTP instead.
    DegradedPolling,
}

/// Terminal and retryable connection error conditions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The identity triple is incomplete; connecting is impossible.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The server rejected the token. Retrying with the same token cannot
    /// succeed, so the user is told to reload and sign in again.
    #[error("authentication failed ({reason}), reload the page to sign in again")]
    AuthenticationFailed {
        /// Server-supplied reason.
        reason: String,
    },

    /// Every dial attempt failed; live updates are suspended.
    #[error("chat connection lost after {attempts} attempts, falling back to periodic refresh")]
    RetriesExhausted {
        /// How many dials were made.
        attempts: u32,
    },
}

impl ConnectionError {
    /// Whether this condition can clear without user intervention.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AuthenticationRequired)
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Dial attempts before degrading.
    pub max_attempts: u32,
    /// Fixed delay between dial attempts.
    pub retry_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, retry_delay: DEFAULT_RETRY_DELAY }
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Dial the realtime transport.
    OpenTransport,

    /// Tear the transport down (or abandon an in-flight dial).
    CloseTransport,

    /// Send the authenticate event carrying the raw bearer token.
    SendAuthenticate {
        /// Token to present.
        token: String,
    },
}

/// Connection lifecycle state machine.
///
/// Generic over `I` (instant type) so production and virtual-clock tests run
/// the same code. Deadlines are stored as start instants and compared against
/// `now` on [`Connection::tick`].
#[derive(Debug, Clone)]
pub struct Connection<I = std::time::Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    identity: Option<Identity>,
    attempts: u32,
    retry_started: Option<I>,
    auth_failed: bool,
    error: Option<ConnectionError>,
    status_message: Option<String>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new connection.
    ///
    /// With `identity: None` the machine stays in
    /// [`ConnectionState::Disconnected`] and exposes
    /// [`ConnectionError::AuthenticationRequired`] instead of ever dialing.
    pub fn new(identity: Option<Identity>, config: ConnectionConfig) -> Self {
        let error = identity.is_none().then_some(ConnectionError::AuthenticationRequired);
        Self {
            state: ConnectionState::Disconnected,
            config,
            identity,
            attempts: 0,
            retry_started: None,
            auth_failed: false,
            error,
            status_message: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current error condition, if any.
    pub fn error(&self) -> Option<&ConnectionError> {
        self.error.as_ref()
    }

    /// Transient status line ("attempting to reconnect (2/5)").
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Dial attempts since the last successful transport connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the channel is usable for emitting events.
    pub fn is_usable(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    /// Whether retries are exhausted and the store should poll over HTTP.
    pub fn is_degraded(&self) -> bool {
        self.state == ConnectionState::DegradedPolling
    }

    /// The identity this connection was built with.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Begin connecting. No-op without a complete identity triple.
    pub fn start(&mut self) -> Vec<ConnectionAction> {
        if self.identity.is_none() {
            self.error = Some(ConnectionError::AuthenticationRequired);
            return vec![];
        }
        if self.state != ConnectionState::Disconnected || self.auth_failed {
            return vec![];
        }

        self.state = ConnectionState::Connecting;
        self.retry_started = None;
        vec![ConnectionAction::OpenTransport]
    }

    /// Transport-level connect succeeded; begin the authenticate step.
    ///
    /// Resets the attempt counter and clears any retryable error, then sends
    /// the authenticate event. The channel is not usable until the
    /// acknowledgment arrives.
    pub fn handle_transport_connected(&mut self) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting {
            // Raced a teardown; the driver will close the stray transport
            return vec![];
        }
        let Some(identity) = &self.identity else {
            return vec![ConnectionAction::CloseTransport];
        };

        self.attempts = 0;
        self.error = None;
        self.status_message = None;
        self.state = ConnectionState::Connected;

        vec![ConnectionAction::SendAuthenticate { token: identity.token.clone() }]
    }

    /// Acknowledgment of the authenticate step.
    ///
    /// Failure is terminal for the session: the same token cannot succeed on
    /// retry, so the retry loop is latched off and the user is told to
    /// reload.
    pub fn handle_authenticated(
        &mut self,
        success: bool,
        error: Option<String>,
    ) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connected {
            return vec![];
        }

        if success {
            self.state = ConnectionState::Authenticated;
            self.error = None;
            return vec![];
        }

        self.auth_failed = true;
        self.state = ConnectionState::Disconnected;
        self.retry_started = None;
        self.error = Some(ConnectionError::AuthenticationFailed {
            reason: error.unwrap_or_else(|| "token rejected".to_owned()),
        });
        vec![ConnectionAction::CloseTransport]
    }

    /// A dial attempt failed.
    ///
    /// Counts the attempt; below the cap this arms the fixed-delay retry
    /// timer, at the cap the machine degrades to polling terminally.
    pub fn handle_connect_failed(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting {
            return vec![];
        }

        self.attempts += 1;

        if self.attempts >= self.config.max_attempts {
            self.state = ConnectionState::DegradedPolling;
            self.retry_started = None;
            self.status_message = None;
            self.error = Some(ConnectionError::RetriesExhausted { attempts: self.attempts });
            return vec![];
        }

        self.state = ConnectionState::Disconnected;
        self.retry_started = Some(now);
        self.status_message = Some(format!(
            "attempting to reconnect ({}/{})",
            self.attempts, self.config.max_attempts
        ));
        vec![]
    }

    /// An established transport dropped (peer-initiated or network loss).
    ///
    /// Arms the retry timer without resetting the attempt counter: the retry
    /// loop is transport-owned and only a successful connect resets it.
    pub fn handle_transport_closed(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.state {
            // A dial that "closed" never completed: count it as a failure
            ConnectionState::Connecting => self.handle_connect_failed(now),
            ConnectionState::Connected | ConnectionState::Authenticated => {
                self.state = ConnectionState::Disconnected;
                self.retry_started = Some(now);
                self.status_message = Some("connection lost, reconnecting".to_owned());
                vec![]
            },
            ConnectionState::Disconnected | ConnectionState::DegradedPolling => vec![],
        }
    }

    /// Periodic maintenance: fire the retry timer when due.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Disconnected || self.auth_failed {
            return vec![];
        }
        let Some(started) = self.retry_started else {
            return vec![];
        };
        if now - started < self.config.retry_delay {
            return vec![];
        }

        self.retry_started = None;
        self.state = ConnectionState::Connecting;
        vec![ConnectionAction::OpenTransport]
    }

    /// Tear down: cancel the armed retry and close whatever is open.
    ///
    /// After this returns no timer is armed and no callback can act on a
    /// disposed connection.
    pub fn shutdown(&mut self) -> Vec<ConnectionAction> {
        let had_transport = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Authenticated
        );
        self.state = ConnectionState::Disconnected;
        self.retry_started = None;
        self.status_message = None;

        if had_transport { vec![ConnectionAction::CloseTransport] } else { vec![] }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Instant;

    use proptest::prelude::*;

    use super::*;

    fn identity() -> Identity {
        Identity { token: "tok".into(), user_id: "u1".into(), role: AccountRole::Buyer }
    }

    fn connection() -> Connection<Instant> {
        Connection::new(Some(identity()), ConnectionConfig::default())
    }

    #[test]
    fn full_lifecycle_reaches_authenticated() {
        let mut conn = connection();
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        let actions = conn.start();
        assert_eq!(actions, vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.state(), ConnectionState::Connecting);

        let actions = conn.handle_transport_connected();
        assert_eq!(actions, vec![ConnectionAction::SendAuthenticate { token: "tok".into() }]);
        assert_eq!(conn.state(), ConnectionState::Connected);

        let actions = conn.handle_authenticated(true, None);
        assert!(actions.is_empty());
        assert!(conn.is_usable());
        assert_eq!(conn.error(), None);
    }

    #[test]
    fn missing_identity_exposes_auth_required_and_never_dials() {
        let mut conn: Connection<Instant> = Connection::new(None, ConnectionConfig::default());
        let actions = conn.start();
        assert!(actions.is_empty());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.error(), Some(&ConnectionError::AuthenticationRequired));
    }

    #[test]
    fn auth_failure_is_terminal_and_latches_retries_off() {
        let mut conn = connection();
        conn.start();
        conn.handle_transport_connected();

        let actions = conn.handle_authenticated(false, Some("expired".into()));
        assert_eq!(actions, vec![ConnectionAction::CloseTransport]);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(conn.error(), Some(ConnectionError::AuthenticationFailed { .. })));

        // No retry ever fires
        let now = Instant::now() + Duration::from_secs(60);
        assert!(conn.tick(now).is_empty());
        assert!(conn.start().is_empty());
    }

    #[test]
    fn dial_failures_retry_with_fixed_delay_and_status() {
        let mut conn = connection();
        let t0 = Instant::now();
        conn.start();

        let actions = conn.handle_connect_failed(t0);
        assert!(actions.is_empty());
        assert_eq!(conn.reconnect_attempts(), 1);
        assert_eq!(conn.status_message(), Some("attempting to reconnect (1/5)"));

        // Not due yet
        assert!(conn.tick(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        // Due
        let actions = conn.tick(t0 + Duration::from_secs(2));
        assert_eq!(actions, vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[test]
    fn fifth_failure_degrades_terminally() {
        let mut conn = connection();
        let mut now = Instant::now();
        conn.start();

        for attempt in 1..=5u32 {
            conn.handle_connect_failed(now);
            if attempt < 5 {
                assert_eq!(conn.state(), ConnectionState::Disconnected);
                now = now + Duration::from_secs(2);
                assert_eq!(conn.tick(now), vec![ConnectionAction::OpenTransport]);
            }
        }

        assert!(conn.is_degraded());
        assert_eq!(conn.reconnect_attempts(), 5);
        assert_eq!(conn.error(), Some(&ConnectionError::RetriesExhausted { attempts: 5 }));

        // Degraded is terminal: the retry timer never re-arms
        now = now + Duration::from_secs(60);
        assert!(conn.tick(now).is_empty());
        assert!(conn.is_degraded());
    }

    #[test]
    fn successful_connect_resets_attempt_counter() {
        let mut conn = connection();
        let t0 = Instant::now();
        conn.start();
        conn.handle_connect_failed(t0);
        conn.tick(t0 + Duration::from_secs(2));
        assert_eq!(conn.reconnect_attempts(), 1);

        conn.handle_transport_connected();
        assert_eq!(conn.reconnect_attempts(), 0);
        assert_eq!(conn.status_message(), None);
    }

    #[test]
    fn drop_of_established_transport_keeps_attempt_count() {
        let mut conn = connection();
        let t0 = Instant::now();
        conn.start();
        conn.handle_connect_failed(t0);
        conn.tick(t0 + Duration::from_secs(2));
        conn.handle_transport_connected();
        conn.handle_authenticated(true, None);

        // Connect succeeded, so attempts reset to 0; now drop twice more and
        // check the counter picks up where the dial loop left it
        let t1 = t0 + Duration::from_secs(10);
        conn.handle_transport_closed(t1);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.reconnect_attempts(), 0);

        conn.tick(t1 + Duration::from_secs(2));
        conn.handle_connect_failed(t1 + Duration::from_secs(2));
        assert_eq!(conn.reconnect_attempts(), 1);
    }

    #[test]
    fn shutdown_cancels_armed_retry() {
        let mut conn = connection();
        let t0 = Instant::now();
        conn.start();
        conn.handle_connect_failed(t0);

        let actions = conn.shutdown();
        assert!(actions.is_empty());

        // The retry that was armed must never fire
        assert!(conn.tick(t0 + Duration::from_secs(30)).is_empty());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn shutdown_closes_open_transport() {
        let mut conn = connection();
        conn.start();
        conn.handle_transport_connected();
        conn.handle_authenticated(true, None);

        assert_eq!(conn.shutdown(), vec![ConnectionAction::CloseTransport]);
    }

    #[test]
    fn stray_events_after_shutdown_are_ignored() {
        let mut conn = connection();
        conn.start();
        conn.shutdown();

        assert!(conn.handle_transport_connected().is_empty());
        assert!(conn.handle_authenticated(true, None).is_empty());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    proptest! {
        // However many dials fail, the counter is capped and degradation is
        // reached at exactly the cap
        #[test]
        fn attempt_counter_is_bounded(failures in 1usize..12) {
            let mut conn = connection();
            let mut now = Instant::now();
            conn.start();

            for _ in 0..failures {
                conn.handle_connect_failed(now);
                now = now + Duration::from_secs(2);
                conn.tick(now);
            }

            prop_assert!(conn.reconnect_attempts() <= DEFAULT_MAX_ATTEMPTS);
            if failures >= DEFAULT_MAX_ATTEMPTS as usize {
                prop_assert!(conn.is_degraded());
            } else {
                prop_assert!(!conn.is_degraded());
            }
        }
    }
}
