//! Socket authentication — resolves a collaborator-issued session token
//! before the upgrade touches any hub state.

use std::sync::Arc;

use agora_core::error::AppError;
use agora_core::result::AppResult;
use agora_core::types::UserId;
use agora_database::repositories::SessionRepository;

/// Identity attached to an upgraded socket.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedSocket {
    /// The authenticated user.
    pub user_id: UserId,
}

/// Authenticates socket upgrades using session tokens issued by the
/// surrounding auth layer.
#[derive(Clone)]
pub struct SocketAuthenticator {
    sessions: Arc<SessionRepository>,
}

impl std::fmt::Debug for SocketAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketAuthenticator").finish()
    }
}

impl SocketAuthenticator {
    /// Creates a new socket authenticator.
    pub fn new(sessions: Arc<SessionRepository>) -> Self {
        Self { sessions }
    }

    /// Resolve a session token (typically from the upgrade query string).
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthenticatedSocket> {
        let session = self
            .sessions
            .find_valid(token)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid or expired session token"))?;

        Ok(AuthenticatedSocket {
            user_id: session.user_id,
        })
    }
}
