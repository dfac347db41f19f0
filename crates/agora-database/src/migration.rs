//! Database schema setup.
//!
//! The messaging core owns three tables. The DDL is idempotent so the
//! runner can execute on every startup.

use sqlx::PgPool;
use tracing::info;

use agora_core::error::{AppError, ErrorKind};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS messages (
        id          BIGSERIAL PRIMARY KEY,
        sender_id   BIGINT NOT NULL,
        receiver_id BIGINT NOT NULL,
        content     TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        read_at     TIMESTAMPTZ
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_users ON messages(sender_id, receiver_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_read_at ON messages(read_at)",
    "CREATE TABLE IF NOT EXISTS user_status (
        user_id   BIGINT PRIMARY KEY,
        is_online BOOLEAN NOT NULL DEFAULT FALSE,
        last_seen TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        token      TEXT PRIMARY KEY,
        user_id    BIGINT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
];

/// Run all schema statements.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running database migrations...");

    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migration: {e}"),
                e,
            )
        })?;
    }

    info!("Database migrations completed successfully");
    Ok(())
}
