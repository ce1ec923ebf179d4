//! Request/response correlation over the push channel
//!
//! Each request gets a fresh id and a pending entry. The entry is settled by
//! exactly one of: a success response, a failure response, or its timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use logwire_types::RequestKind;

use crate::connection::ConnectionHandle;
use crate::error::{ClientError, Result};
use crate::protocol::{RequestFrame, ResponseFrame};

type Responder = oneshot::Sender<Result<Value>>;

/// An outstanding request awaiting its response
pub struct PendingRequest {
    pub id: u64,
    pub kind: RequestKind,
    pub issued_at: Instant,
    settled: Arc<AtomicBool>,
    responder: Responder,
}

impl PendingRequest {
    /// Deliver the outcome. Returns `false` if the request was already settled.
    fn settle(self, outcome: Result<Value>) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            return false;
        }
        // The caller may have gone away; nothing to do then
        let _ = self.responder.send(outcome);
        true
    }
}

struct Inner {
    connection: ConnectionHandle,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

/// Turns the streaming connection into async request calls
#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Inner>,
}

impl Correlator {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self {
            inner: Arc::new(Inner {
                connection,
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Send a request and wait for its response.
    ///
    /// Fails immediately with `NotConnected` unless the connection is open; in
    /// that case nothing is sent and nothing is registered.
    pub async fn request(&self, kind: RequestKind, data: Value, timeout: Duration) -> Result<Value> {
        if !self.inner.connection.state().is_open() {
            return Err(ClientError::NotConnected);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let text = RequestFrame::new(kind, id, data).to_text()?;

        let (tx, mut rx) = oneshot::channel();
        let settled = Arc::new(AtomicBool::new(false));
        self.inner.pending.lock().insert(
            id,
            PendingRequest {
                id,
                kind,
                issued_at: Instant::now(),
                settled: Arc::clone(&settled),
                responder: tx,
            },
        );
        let _guard = PendingGuard {
            inner: &self.inner,
            id,
        };

        self.inner.connection.send(text)?;
        debug!(id, %kind, "request sent");

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::Transport(format!(
                "request {id} dropped before completion"
            ))),
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                let expired = self.inner.pending.lock().remove(&id);
                if let Some(entry) = expired {
                    warn!(id, %kind, timeout_ms, "request timed out");
                    entry.settle(Err(ClientError::Timeout {
                        timeout_ms,
                        context: format!("{kind} request {id}"),
                    }));
                }
                // Whichever outcome settled first is the one delivered
                rx.try_recv().unwrap_or_else(|_| {
                    Err(ClientError::Timeout {
                        timeout_ms,
                        context: format!("{kind} request {id}"),
                    })
                })
            }
        }
    }

    /// Settle the pending request matching this response.
    ///
    /// Returns `false` when no entry matches (late, duplicate or unknown id).
    pub fn resolve(&self, response: ResponseFrame) -> bool {
        let id = response.request_id;
        let entry = self.inner.pending.lock().remove(&id);
        match entry {
            Some(entry) => {
                let kind = entry.kind;
                let elapsed = entry.issued_at.elapsed();
                let delivered = entry.settle(response.into_outcome());
                debug!(id, %kind, ?elapsed, delivered, "response matched");
                delivered
            }
            None => false,
        }
    }

    /// Number of requests awaiting a response
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.inner.connection
    }
}

/// Drops the pending entry when the request future ends for any reason
struct PendingGuard<'a> {
    inner: &'a Inner,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.pending.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwire_types::ConnectionState;
    use serde_json::json;

    fn response(id: u64, success: bool, data: Value) -> ResponseFrame {
        ResponseFrame {
            request_id: id,
            success,
            data: Some(data),
            error: if success { None } else { Some("boom".to_string()) },
        }
    }

    #[tokio::test]
    async fn test_not_connected_has_no_side_effects() {
        let (handle, _state, mut outbound) = ConnectionHandle::detached(ConnectionState::Connecting);
        let correlator = Correlator::new(handle);

        let result = correlator
            .request(RequestKind::GetStats, json!({}), Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert_eq!(correlator.pending_count(), 0);
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_response_resolves_request() {
        let (handle, _state, mut outbound) = ConnectionHandle::detached(ConnectionState::Open);
        let correlator = Correlator::new(handle);

        let caller = correlator.clone();
        let call = tokio::spawn(async move {
            caller
                .request(RequestKind::GetLogs, json!({"limit": 5}), Duration::from_secs(5))
                .await
        });

        let sent: Value = serde_json::from_str(&outbound.recv().await.unwrap()).unwrap();
        assert_eq!(sent["requestType"], "get_logs");
        assert_eq!(sent["requestId"], 1);
        assert_eq!(correlator.pending_count(), 1);

        assert!(correlator.resolve(response(1, true, json!(["a"]))));
        assert_eq!(call.await.unwrap().unwrap(), json!(["a"]));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_response_is_application_error() {
        let (handle, _state, mut outbound) = ConnectionHandle::detached(ConnectionState::Open);
        let correlator = Correlator::new(handle);

        let caller = correlator.clone();
        let call = tokio::spawn(async move {
            caller
                .request(RequestKind::ClearLogs, json!({}), Duration::from_secs(5))
                .await
        });
        outbound.recv().await.unwrap();

        assert!(correlator.resolve(response(1, false, Value::Null)));
        match call.await.unwrap() {
            Err(ClientError::Application(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let (handle, _state, mut outbound) = ConnectionHandle::detached(ConnectionState::Open);
        let correlator = Correlator::new(handle);

        for _ in 0..3 {
            let caller = correlator.clone();
            tokio::spawn(async move {
                let _ = caller
                    .request(RequestKind::GetStats, json!({}), Duration::from_secs(5))
                    .await;
            });
        }

        let mut ids = Vec::new();
        for _ in 0..3 {
            let sent: Value = serde_json::from_str(&outbound.recv().await.unwrap()).unwrap();
            ids.push(sent["requestId"].as_u64().unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_entry_and_drops_late_response() {
        let (handle, _state, mut outbound) = ConnectionHandle::detached(ConnectionState::Open);
        let correlator = Correlator::new(handle);

        let result = correlator
            .request(RequestKind::GetStats, json!({}), Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ClientError::Timeout { timeout_ms: 100, .. })));
        assert_eq!(correlator.pending_count(), 0);
        assert!(outbound.try_recv().is_ok());

        // A late response for the expired id is dropped, not delivered twice
        assert!(!correlator.resolve(response(1, true, json!({}))));
    }

    #[tokio::test]
    async fn test_settle_is_first_writer_wins() {
        let (tx, mut rx) = oneshot::channel();
        let settled = Arc::new(AtomicBool::new(false));
        let first = PendingRequest {
            id: 1,
            kind: RequestKind::GetStats,
            issued_at: Instant::now(),
            settled: Arc::clone(&settled),
            responder: tx,
        };
        let (tx2, _rx2) = oneshot::channel();
        let second = PendingRequest {
            id: 1,
            kind: RequestKind::GetStats,
            issued_at: Instant::now(),
            settled: Arc::clone(&settled),
            responder: tx2,
        };

        assert!(first.settle(Ok(json!(1))));
        assert!(!second.settle(Ok(json!(2))));
        assert_eq!(rx.try_recv().unwrap().unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_dropped_request_cleans_up() {
        let (handle, _state, mut outbound) = ConnectionHandle::detached(ConnectionState::Open);
        let correlator = Correlator::new(handle);

        let caller = correlator.clone();
        let call = tokio::spawn(async move {
            caller
                .request(RequestKind::GetStats, json!({}), Duration::from_secs(60))
                .await
        });
        outbound.recv().await.unwrap();
        assert_eq!(correlator.pending_count(), 1);

        call.abort();
        let _ = call.await;
        assert_eq!(correlator.pending_count(), 0);
    }
}
