//! Account creation for every account kind.
//!
//! Each service validates its request before touching storage, hashes the password,
//! picks the first session id, rejects identifiers already held by a password
//! credential and then writes the aggregate through the [`TransactionCoordinator`].
//! The returned token is bound to the session id written during signup.

use std::sync::Arc;

use crate::{
    auth::{
        error::{AuthError, AuthResult},
        hasher::CredentialHasher,
        role::{AccountKind, Role},
        token::TokenIssuer,
    },
    store::{AccountStore, Identifier},
};

pub mod facility_manager;
pub mod organization;
pub mod pet_owner;
pub mod transaction;

pub use facility_manager::{FacilityManagerProvisioning, FacilityManagerSignup};
pub use organization::{OrganizationContract, OrganizationProvisioning};
pub use pet_owner::{PetOwnerProvisioning, PetOwnerSignup};
pub use transaction::{OrganizationRef, ProvisionKeys, ProvisionStep, TransactionCoordinator};

/// Result of a committed signup.
#[derive(Clone, Debug)]
pub struct Provisioned {
    pub subject_id: i64,
    pub role: Role,
    pub access_token: String,
}

/// Dependencies shared by the provisioning services.
#[derive(Clone)]
pub struct ProvisioningContext {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    issuer: Arc<TokenIssuer>,
    coordinator: Arc<TransactionCoordinator>,
}

impl ProvisioningContext {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: CredentialHasher,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        let coordinator = Arc::new(TransactionCoordinator::new(Arc::clone(&store)));
        Self {
            store,
            hasher,
            issuer,
            coordinator,
        }
    }

    /// Fail with `AlreadyRegistered` if any identifier is held by a password credential.
    pub(crate) async fn ensure_unregistered(
        &self,
        kind: AccountKind,
        identifiers: &[Identifier],
    ) -> AuthResult<()> {
        for identifier in identifiers {
            let existing = self
                .store
                .count_password_credentials(kind, identifier)
                .await?;
            if existing > 0 {
                return Err(AuthError::AlreadyRegistered(identifier.field()));
            }
        }
        Ok(())
    }

    /// Commit `steps` and sign a token for the identity they created.
    pub(crate) async fn commit_and_issue(
        &self,
        steps: &[ProvisionStep],
        session_id: &str,
        role: Role,
    ) -> AuthResult<Provisioned> {
        let keys = self.coordinator.run_atomically(steps).await?;
        let subject_id = keys.identity_id.ok_or_else(|| {
            AuthError::store(anyhow::anyhow!("provisioning produced no identity"))
        })?;
        let access_token = self.issuer.issue(subject_id, session_id, role)?;
        Ok(Provisioned {
            subject_id,
            role,
            access_token,
        })
    }

    pub(crate) fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub(crate) fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }
}
