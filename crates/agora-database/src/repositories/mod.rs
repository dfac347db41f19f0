//! Repository implementations for the Agora store.

pub mod message;
pub mod presence;
pub mod session;

pub use message::MessageRepository;
pub use presence::PresenceRepository;
pub use session::SessionRepository;
