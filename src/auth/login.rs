use std::sync::Arc;
use tracing::{error, info};

use super::{
    error::{AuthError, AuthResult},
    hasher::CredentialHasher,
    role::AccountKind,
    session_id::generate_session_id,
    token::TokenIssuer,
};
use crate::store::{AccountStore, Identifier};

/// Password login. A successful login rotates the account's session slot, which
/// invalidates every token issued before it.
pub struct LoginService {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    issuer: Arc<TokenIssuer>,
}

impl LoginService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: CredentialHasher,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            issuer,
        }
    }

    /// Authenticate and return a fresh bearer token.
    ///
    /// # Errors
    /// `NotFound` when no credential matches, `AuthenticationFailed` on a wrong
    /// password, `DataInconsistency` when the identifier is shared by several
    /// credentials, plus store/hash/sign failures.
    pub async fn login(
        &self,
        kind: AccountKind,
        identifier: &Identifier,
        password: &str,
    ) -> AuthResult<String> {
        let mut matches = self
            .store
            .find_password_credentials(kind, identifier)
            .await?;

        let credential = match matches.len() {
            0 => return Err(AuthError::NotFound),
            1 => matches.remove(0),
            count => {
                error!(
                    account_kind = %kind,
                    identifier = %identifier,
                    count,
                    "password credential identifier is not unique"
                );
                return Err(AuthError::DataInconsistency);
            }
        };

        self.hasher
            .verify(&credential.password_hash, password)
            .await?;

        let session_id = generate_session_id()?;
        self.store
            .set_session_id(credential.account_id, kind, &session_id)
            .await?;

        let role = kind.role(credential.is_admin);
        let token = self
            .issuer
            .issue(credential.account_id, &session_id, role)?;

        info!(
            account_kind = %kind,
            subject_id = credential.account_id,
            role = %role,
            "login succeeded"
        );
        Ok(token)
    }
}
