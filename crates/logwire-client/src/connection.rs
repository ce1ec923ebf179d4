//! Streaming connection with automatic reconnection
//!
//! A single task owns the WebSocket. Callers hold a [`ConnectionHandle`] for
//! sending and teardown, and consume [`TransportEvent`]s in arrival order.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use logwire_types::ConnectionState;

use crate::error::{ClientError, Result};
use crate::policy::{ReconnectConfig, ReconnectPolicy};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Notifications published by the connection task
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The connection moved to a new state
    StateChanged(ConnectionState),
    /// A reconnect attempt will start after `delay`
    ReconnectScheduled {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    /// A text frame arrived
    Frame(String),
}

/// Cloneable handle to the connection task
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    state_rx: watch::Receiver<ConnectionState>,
    outbound_tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Queue a text frame. Fails with `NotConnected` unless the state is Open.
    pub fn send(&self, text: String) -> Result<()> {
        if !self.state().is_open() {
            return Err(ClientError::NotConnected);
        }
        self.outbound_tx
            .send(text)
            .map_err(|_| ClientError::NotConnected)
    }

    /// Close gracefully and stop reconnecting
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle with no task behind it. Tests drive the state and read the
    /// outbound frames directly.
    #[cfg(test)]
    pub(crate) fn detached(
        state: ConnectionState,
    ) -> (
        Self,
        watch::Sender<ConnectionState>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (state_tx, state_rx) = watch::channel(state);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let handle = Self {
            state_rx,
            outbound_tx,
            cancel: CancellationToken::new(),
        };
        (handle, state_tx, outbound_rx)
    }
}

/// Entry point for opening a streaming connection
pub struct Connection;

impl Connection {
    /// Spawn the connection task. Must be called inside a tokio runtime.
    ///
    /// The open happens asynchronously; watch the returned events for
    /// `StateChanged(Open)`.
    pub fn open(
        url: impl Into<String>,
        reconnect: ReconnectConfig,
    ) -> (ConnectionHandle, mpsc::UnboundedReceiver<TransportEvent>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = ConnectionTask {
            url: url.into(),
            policy: ReconnectPolicy::new(reconnect),
            state_tx,
            events_tx,
            outbound_rx,
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run());

        let handle = ConnectionHandle {
            state_rx,
            outbound_tx,
            cancel,
        };
        (handle, events_rx)
    }
}

/// Why a session ended
enum SessionEnd {
    Closed,
    Errored(String),
    Shutdown,
}

struct ConnectionTask {
    url: String,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
}

impl ConnectionTask {
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((ws, _response)) => {
                    info!(url = %self.url, "connection open");
                    self.policy.reset();
                    self.set_state(ConnectionState::Open);

                    match self.drive(ws).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Closed => {
                            info!(url = %self.url, "connection closed by server");
                            self.set_state(ConnectionState::Closed);
                        }
                        SessionEnd::Errored(reason) => {
                            warn!(url = %self.url, %reason, "connection error");
                            self.set_state(ConnectionState::Errored);
                        }
                    }
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "connect failed");
                    self.set_state(ConnectionState::Errored);
                }
            }

            self.discard_stale_outbound();

            let Some(delay) = self.policy.next_delay() else {
                error!(
                    url = %self.url,
                    max_attempts = self.policy.max_attempts(),
                    "reconnect attempts exhausted, giving up"
                );
                self.set_state(ConnectionState::Failed);
                return;
            };

            let attempt = self.policy.attempts();
            let max_attempts = self.policy.max_attempts();
            info!(attempt, max_attempts, ?delay, "reconnect scheduled");
            let _ = self.events_tx.send(TransportEvent::ReconnectScheduled {
                attempt,
                max_attempts,
                delay,
            });

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Closed);
    }

    /// Pump frames both ways until the session ends
    async fn drive(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }

                outbound = self.outbound_rx.recv() => {
                    let Some(text) = outbound else {
                        // Every handle is gone
                        let _ = sink.send(Message::Close(None)).await;
                        return SessionEnd::Shutdown;
                    };
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        return SessionEnd::Errored(e.to_string());
                    }
                }

                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            let _ = self.events_tx.send(TransportEvent::Frame(text.as_str().to_owned()));
                        }
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => {
                                let _ = self.events_tx.send(TransportEvent::Frame(text));
                            }
                            Err(_) => warn!(len = bytes.len(), "dropping non-UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "close frame received");
                            return SessionEnd::Closed;
                        }
                        // Ping/pong replies are handled by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return SessionEnd::Errored(e.to_string()),
                        None => return SessionEnd::Closed,
                    }
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(?previous, ?state, "connection state changed");
        }
        let _ = self.events_tx.send(TransportEvent::StateChanged(state));
    }

    /// Frames queued for a session that ended before they were written
    fn discard_stale_outbound(&mut self) {
        let mut dropped = 0usize;
        while self.outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "discarded frames queued for a closed session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_requires_open() {
        let (handle, state_tx, mut outbound) = ConnectionHandle::detached(ConnectionState::Closed);
        assert!(matches!(
            handle.send("x".to_string()),
            Err(ClientError::NotConnected)
        ));
        assert!(outbound.try_recv().is_err());

        state_tx.send_replace(ConnectionState::Open);
        handle.send("x".to_string()).unwrap();
        assert_eq!(outbound.try_recv().unwrap(), "x");
    }

    #[tokio::test]
    async fn test_unreachable_server_exhausts_attempts() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ReconnectConfig {
            max_attempts: 2,
            base_delay_ms: 5,
            multiplier: 2.0,
            max_delay_ms: 50,
        };
        let (handle, mut events) = Connection::open(format!("ws://127.0.0.1:{port}/ws"), config);

        let mut scheduled = Vec::new();
        let mut states = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::StateChanged(state) => {
                    states.push(state);
                    if state.is_terminal() {
                        break;
                    }
                }
                TransportEvent::ReconnectScheduled { attempt, delay, .. } => {
                    scheduled.push((attempt, delay));
                }
                TransportEvent::Frame(_) => panic!("no frames expected"),
            }
        }

        assert_eq!(
            scheduled,
            vec![
                (1, Duration::from_millis(5)),
                (2, Duration::from_millis(10)),
            ]
        );
        assert!(!states.contains(&ConnectionState::Open));
        assert_eq!(states.last(), Some(&ConnectionState::Failed));
        assert_eq!(handle.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_close_stops_reconnecting() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ReconnectConfig {
            max_attempts: 100,
            base_delay_ms: 10_000,
            multiplier: 1.0,
            max_delay_ms: 10_000,
        };
        let (handle, mut events) = Connection::open(format!("ws://127.0.0.1:{port}/ws"), config);

        // Wait for the first retry to be scheduled, then tear down
        while let Some(event) = events.recv().await {
            if matches!(event, TransportEvent::ReconnectScheduled { .. }) {
                break;
            }
        }
        handle.close();

        let mut last = None;
        while let Some(event) = events.recv().await {
            if let TransportEvent::StateChanged(state) = event {
                last = Some(state);
            }
        }
        assert_eq!(last, Some(ConnectionState::Closed));
        assert!(handle.is_closed());
    }
}
