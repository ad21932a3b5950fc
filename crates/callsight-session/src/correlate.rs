//! Correlation of fire-and-forget requests with their out-of-band responses.
//!
//! The analysis side runs as a detached agent, so a request and its response
//! cannot use an ordinary call/return. Each outbound request registers a
//! pending entry keyed by an opaque request id; the inbound channel resolves
//! it later, or the timeout rejects it and removes the entry. A late response
//! for an id no longer tracked is a silent no-op, because the requester has
//! already given up.

use callsight_core::SessionError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use uuid::Uuid;

type EntryMap<T> = Arc<Mutex<HashMap<String, oneshot::Sender<T>>>>;

/// The pending-request table, owned by the session (no process-wide state).
pub struct PendingRequests<T> {
    entries: EntryMap<T>,
}

impl<T> Clone for PendingRequests<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T: Send + 'static> Default for PendingRequests<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> PendingRequests<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a new pending entry. The generated id only has to avoid
    /// collisions within the lifetime of the pending set, which the
    /// timestamp + random suffix scheme guarantees in practice.
    pub fn create(&self, prefix: &str, timeout: Duration) -> (String, PendingReply<T>) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let request_id = format!("{prefix}-{millis}-{}", Uuid::new_v4().simple());

        let (tx, rx) = oneshot::channel();
        self.entries.lock().insert(request_id.clone(), tx);

        let reply = PendingReply {
            request_id: request_id.clone(),
            rx,
            timeout,
            entries: Arc::clone(&self.entries),
        };
        (request_id, reply)
    }

    /// Resolve a pending entry. Unknown or already-timed-out ids are a
    /// silent no-op.
    pub fn resolve(&self, request_id: &str, value: T) {
        match self.entries.lock().remove(request_id) {
            Some(tx) => {
                let _ = tx.send(value);
            }
            None => {
                tracing::debug!(request_id = %request_id, "dropping reply for untracked request");
            }
        }
    }

    /// Drop a pending entry without resolving it (e.g. the outbound send
    /// itself failed).
    pub fn cancel(&self, request_id: &str) {
        self.entries.lock().remove(request_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// The awaitable side of a pending entry.
pub struct PendingReply<T> {
    request_id: String,
    rx: oneshot::Receiver<T>,
    timeout: Duration,
    entries: EntryMap<T>,
}

impl<T> PendingReply<T> {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the correlated response or the timeout, whichever first.
    /// On timeout the entry is removed so a late response becomes a no-op.
    pub async fn recv(self) -> Result<T, SessionError> {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(SessionError::ChannelClosed(self.request_id)),
            Err(_) => {
                self.entries.lock().remove(&self.request_id);
                Err(SessionError::Timeout(self.request_id))
            }
        }
    }
}
