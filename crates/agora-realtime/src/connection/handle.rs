//! Individual connection handle.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use agora_core::types::UserId;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Why a non-blocking push onto the outbound queue was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    /// The queue is full; the consumer is not keeping pace.
    #[error("outbound queue full")]
    Full,
    /// The outbound pump is gone.
    #[error("outbound queue closed")]
    Closed,
}

/// Hub-side handle to a single live connection.
///
/// Holds the bounded sender feeding the outbound pump plus the liveness
/// stamp the sweep reads. The registry owns the only long-lived reference;
/// dropping it closes the outbound queue, which is the teardown signal for
/// the connection's pumps.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Authenticated user bound to this connection.
    pub user_id: UserId,
    /// When the connection was registered.
    pub connected_at: DateTime<Utc>,
    /// Bounded sender for serialized outbound frames.
    sender: mpsc::Sender<String>,
    /// Last liveness report, unix milliseconds.
    last_seen_ms: AtomicI64,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its outbound pump will drain.
    pub fn channel(user_id: UserId, buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        let now = Utc::now();
        let handle = Self {
            id: Uuid::new_v4(),
            user_id,
            connected_at: now,
            sender: tx,
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
        };
        (handle, rx)
    }

    /// Non-blocking push of a serialized frame onto the outbound queue.
    pub fn push(&self, payload: String) -> Result<(), PushError> {
        match self.sender.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(PushError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PushError::Closed),
        }
    }

    /// Refresh the liveness stamp.
    pub fn touch(&self) {
        self.last_seen_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    /// Last liveness report.
    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen_ms.load(Ordering::SeqCst))
            .unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_full_then_closed() {
        let (handle, rx) = ConnectionHandle::channel(UserId::new(1), 1);
        assert_eq!(handle.push("a".into()), Ok(()));
        assert_eq!(handle.push("b".into()), Err(PushError::Full));
        drop(rx);
        assert_eq!(handle.push("c".into()), Err(PushError::Closed));
    }

    #[test]
    fn test_touch_advances_last_seen() {
        let (handle, _rx) = ConnectionHandle::channel(UserId::new(1), 1);
        let before = handle.last_seen();
        handle.touch();
        assert!(handle.last_seen() >= before);
    }
}
