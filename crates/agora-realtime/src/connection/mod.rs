//! Per-connection state and I/O routines.

pub mod authenticator;
pub mod handle;
pub mod pump;
