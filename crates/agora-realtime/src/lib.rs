//! # agora-realtime
//!
//! In-process real-time messaging broker for the Agora forum. Provides:
//!
//! - A single-writer hub event loop owning the connection registry
//! - Per-connection inbound/outbound socket pumps with bounded queues
//! - Durable presence tracking with `status_update` fan-out
//! - An inactivity sweep for half-open sockets
//! - Session-token authentication at the socket upgrade boundary
//!
//! The registry is mutated only inside the hub task; everything else talks
//! to the hub through bounded channels.

pub mod connection;
pub mod hub;
pub mod presence;
pub mod protocol;
pub mod store;

pub use connection::authenticator::{AuthenticatedSocket, SocketAuthenticator};
pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use hub::{Hub, HubHandle};
pub use presence::PresenceTracker;
pub use store::{ChatStore, SqlChatStore};
