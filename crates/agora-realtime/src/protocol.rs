//! Wire protocol for the messaging socket.
//!
//! Client frames are decoded once at the boundary into a tagged sum type;
//! the hub matches on it exhaustively. Client-supplied `sender_id` and
//! `timestamp` fields are deliberately absent from the decoded shape —
//! the inbound pump stamps both server-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agora_core::types::{MessageId, UserId};

use crate::connection::handle::ConnectionId;

/// Frames sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Direct chat message to another user.
    Message {
        /// Message body.
        content: String,
        /// Target user.
        receiver_id: UserId,
        /// Client-side correlation ID, echoed back in the delivery frame.
        #[serde(default)]
        temp_id: Option<String>,
    },
    /// Mark every unread message from `sender_id` to this user as read.
    Read {
        /// The conversation partner whose messages are being acknowledged.
        sender_id: UserId,
    },
    /// Liveness-only frame; never persisted.
    Heartbeat,
}

/// A decoded client frame stamped with server-assigned identity and time.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Connection the frame arrived on.
    pub connection_id: ConnectionId,
    /// Authenticated user bound to that connection; never the value the
    /// client claims.
    pub sender_id: UserId,
    /// Server receipt time.
    pub received_at: DateTime<Utc>,
    /// The decoded frame.
    pub frame: ClientFrame,
}

impl Inbound {
    /// Wrap a decoded frame with server-side stamps.
    pub fn new(connection_id: ConnectionId, sender_id: UserId, frame: ClientFrame) -> Self {
        Self {
            connection_id,
            sender_id,
            received_at: Utc::now(),
            frame,
        }
    }

    /// A liveness-only event, used for both wire heartbeats and pongs.
    pub fn heartbeat(connection_id: ConnectionId, sender_id: UserId) -> Self {
        Self::new(connection_id, sender_id, ClientFrame::Heartbeat)
    }
}

/// Frames sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Delivery of a persisted chat message.
    Message {
        /// Persisted message ID.
        id: MessageId,
        /// Message body.
        content: String,
        /// Server-stamped sender.
        sender_id: UserId,
        /// Target user.
        receiver_id: UserId,
        /// Server-stamped creation time.
        timestamp: DateTime<Utc>,
        /// Echo of the client correlation ID, if one was supplied.
        #[serde(skip_serializing_if = "Option::is_none")]
        temp_id: Option<String>,
    },
    /// Presence change notification.
    StatusUpdate {
        /// User whose presence changed.
        user_id: UserId,
        /// New online flag.
        is_online: bool,
        /// Stored last-seen timestamp.
        last_seen: DateTime<Utc>,
    },
}

impl ServerFrame {
    /// Serialize for the wire. Serialization of these shapes cannot fail;
    /// an empty string is returned defensively rather than panicking.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_frame() {
        let raw = r#"{"type":"message","content":"hi","receiver_id":7,"temp_id":"t-1"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).expect("decode");
        match frame {
            ClientFrame::Message {
                content,
                receiver_id,
                temp_id,
            } => {
                assert_eq!(content, "hi");
                assert_eq!(receiver_id, UserId::new(7));
                assert_eq!(temp_id.as_deref(), Some("t-1"));
            }
            other => panic!("expected message frame, got {other:?}"),
        }
    }

    #[test]
    fn test_client_sender_and_timestamp_are_ignored() {
        // A client claiming someone else's identity decodes fine, but the
        // claimed fields have nowhere to land.
        let raw = r#"{"type":"message","content":"hi","receiver_id":7,
                      "sender_id":999,"timestamp":"2020-01-01T00:00:00Z"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).expect("decode");
        assert!(matches!(frame, ClientFrame::Message { .. }));
    }

    #[test]
    fn test_decode_read_frame() {
        let raw = r#"{"type":"read","sender_id":3}"#;
        let frame: ClientFrame = serde_json::from_str(raw).expect("decode");
        assert!(matches!(
            frame,
            ClientFrame::Read {
                sender_id
            } if sender_id == UserId::new(3)
        ));
    }

    #[test]
    fn test_decode_heartbeat_with_extra_fields() {
        let raw = r#"{"type":"heartbeat","timestamp":"2024-06-01T12:00:00Z"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).expect("decode");
        assert!(matches!(frame, ClientFrame::Heartbeat));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = r#"{"type":"shutdown_everything"}"#;
        assert!(serde_json::from_str::<ClientFrame>(raw).is_err());
    }

    #[test]
    fn test_status_update_wire_shape() {
        let frame = ServerFrame::StatusUpdate {
            user_id: UserId::new(5),
            is_online: false,
            last_seen: "2024-06-01T12:00:00Z".parse().expect("timestamp"),
        };
        let value: serde_json::Value =
            serde_json::from_str(&frame.to_json()).expect("round-trip");
        assert_eq!(value["type"], "status_update");
        assert_eq!(value["user_id"], 5);
        assert_eq!(value["is_online"], false);
        assert!(value["last_seen"].is_string());
    }

    #[test]
    fn test_delivery_frame_omits_absent_temp_id() {
        let frame = ServerFrame::Message {
            id: MessageId::new(1),
            content: "hi".into(),
            sender_id: UserId::new(1),
            receiver_id: UserId::new(2),
            timestamp: Utc::now(),
            temp_id: None,
        };
        let value: serde_json::Value =
            serde_json::from_str(&frame.to_json()).expect("round-trip");
        assert_eq!(value["type"], "message");
        assert!(value.get("temp_id").is_none());
    }
}
