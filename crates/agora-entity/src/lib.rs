//! # agora-entity
//!
//! Persisted domain models for the Agora forum backend: chat messages,
//! per-user presence rows, and the collaborator-owned session rows the
//! upgrade boundary reads.

pub mod message;
pub mod presence;
pub mod session;

pub use message::ChatMessage;
pub use presence::PresenceRecord;
pub use session::Session;
