use std::sync::Arc;
use tracing::info;

use super::{error::AuthResult, token::Principal};
use crate::store::SessionStore;

pub struct RevokeService {
    sessions: Arc<dyn SessionStore>,
}

impl RevokeService {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Clear the caller's session slot. Revoking twice is not an error.
    ///
    /// # Errors
    /// Returns a store failure.
    pub async fn revoke(&self, principal: &Principal) -> AuthResult<()> {
        self.sessions
            .clear_session_id(principal.subject_id, principal.account_kind)
            .await?;
        info!(
            account_kind = %principal.account_kind,
            subject_id = principal.subject_id,
            "session revoked"
        );
        Ok(())
    }
}
