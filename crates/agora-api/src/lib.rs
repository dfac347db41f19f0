//! # agora-api
//!
//! HTTP gateway for the Agora messaging core. Carries the `/ws` upgrade
//! boundary (pre-authenticated identity required), health probes, and the
//! HTTP-side presence read, which goes to the store rather than the live
//! registry.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
