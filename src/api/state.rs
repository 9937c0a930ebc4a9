use std::sync::Arc;

use crate::{
    auth::{
        AuthConfig, CredentialHasher, LoginService, RevokeService, TokenIssuer, TokenValidator,
    },
    provisioning::{
        FacilityManagerProvisioning, OrganizationProvisioning, PetOwnerProvisioning,
        ProvisioningContext,
    },
    store::AccountStore,
};

/// Request-independent services shared by every handler.
pub struct AuthState {
    store: Arc<dyn AccountStore>,
    validator: TokenValidator,
    login: LoginService,
    revoke: RevokeService,
    pet_owners: PetOwnerProvisioning,
    facility_managers: FacilityManagerProvisioning,
    organizations: OrganizationProvisioning,
}

impl AuthState {
    #[must_use]
    pub fn new<S: AccountStore + 'static>(config: &AuthConfig, store: Arc<S>) -> Self {
        let hasher = CredentialHasher::with_cost(config.hash_cost());
        let issuer = Arc::new(TokenIssuer::new(
            config.jwt_secret(),
            config.jwt_expiry_hours(),
        ));
        let context = ProvisioningContext::new(store.clone(), hasher, Arc::clone(&issuer));

        Self {
            validator: TokenValidator::new(config.jwt_secret(), store.clone()),
            login: LoginService::new(store.clone(), hasher, issuer),
            revoke: RevokeService::new(store.clone()),
            pet_owners: PetOwnerProvisioning::new(context.clone()),
            facility_managers: FacilityManagerProvisioning::new(context.clone()),
            organizations: OrganizationProvisioning::new(context),
            store,
        }
    }

    pub(crate) fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    pub(crate) fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub(crate) fn login(&self) -> &LoginService {
        &self.login
    }

    pub(crate) fn revoke(&self) -> &RevokeService {
        &self.revoke
    }

    pub(crate) fn pet_owners(&self) -> &PetOwnerProvisioning {
        &self.pet_owners
    }

    pub(crate) fn facility_managers(&self) -> &FacilityManagerProvisioning {
        &self.facility_managers
    }

    pub(crate) fn organizations(&self) -> &OrganizationProvisioning {
        &self.organizations
    }
}
