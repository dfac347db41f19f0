//! # agora-database
//!
//! PostgreSQL access layer for the Agora forum backend: pool management,
//! schema migration, and the repositories backing the message store and
//! the upgrade boundary.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
