//! WebSocket transport for the client.
//!
//! Provides [`connect`] which dials the realtime endpoint and returns a
//! [`ConnectedTransport`] with channels for event transport. This is a thin
//! layer that just encodes/decodes JSON text frames; protocol logic remains
//! in the Sans-IO [`crate::Client`].

use futures_util::{SinkExt, StreamExt};
use haggle_proto::{ClientMessage, ServerMessage};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use haggle_core::env::Environment;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dialing the endpoint failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The websocket stream failed mid-session.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Events the transport forwards to the runtime.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A decoded server event.
    Message(ServerMessage),

    /// The connection closed (peer-initiated, network loss, or stream
    /// error). The state machine decides whether to redial.
    Closed,
}

/// Handle to a connected websocket transport.
///
/// Events are sent/received via the channels; an internal task handles the
/// socket I/O. Dropping the handle (or calling [`ConnectedTransport::stop`])
/// aborts the task.
pub struct ConnectedTransport {
    /// Send events to the server.
    pub to_server: mpsc::Sender<ClientMessage>,
    /// Receive events from the server.
    pub from_server: mpsc::Receiver<TransportEvent>,
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedTransport {
    /// Stop the connection task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedTransport {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Dial the realtime endpoint (`ws://` or `wss://` URL).
///
/// # Errors
///
/// Returns [`TransportError::Connection`] if the websocket handshake fails.
pub async fn connect(url: &str) -> Result<ConnectedTransport, TransportError> {
    let (ws, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<ClientMessage>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<TransportEvent>(32);

    let handle = tokio::spawn(run_connection(ws, to_server_rx, from_server_tx));

    Ok(ConnectedTransport {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between channels and the websocket.
async fn run_connection(
    ws: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    mut to_server: mpsc::Receiver<ClientMessage>,
    from_server: mpsc::Sender<TransportEvent>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            outbound = to_server.recv() => {
                let Some(event) = outbound else {
                    // Client side dropped; close politely
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                };
                match event.encode() {
                    Ok(text) => {
                        if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                            tracing::warn!(error = %e, "websocket send failed");
                            let _ = from_server.send(TransportEvent::Closed).await;
                            break;
                        }
                    },
                    Err(e) => {
                        // Encoding is practically infallible; never kill the
                        // connection over one frame
                        tracing::warn!(error = %e, event = event.event_name(), "dropped outbound event");
                    },
                }
            },
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        match ServerMessage::decode(&text) {
                            Ok(msg) => {
                                if from_server.send(TransportEvent::Message(msg)).await.is_err() {
                                    break;
                                }
                            },
                            Err(e) => {
                                // Malformed payloads are logged and skipped
                                tracing::warn!(error = %e, "ignoring malformed server event");
                            },
                        }
                    },
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Binary(_) | WsMessage::Frame(_))) => {
                        // Keepalives handled by tungstenite; binary frames
                        // are not part of this protocol
                    },
                    Some(Ok(WsMessage::Close(_))) | None => {
                        let _ = from_server.send(TransportEvent::Closed).await;
                        break;
                    },
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "websocket stream error");
                        let _ = from_server.send(TransportEvent::Closed).await;
                        break;
                    },
                }
            },
        }
    }
}

/// Production environment backed by the system clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: std::time::Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
