use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::{OrganizationRef, ProvisionStep, Provisioned, ProvisioningContext};
use crate::{
    auth::{
        error::AuthResult,
        role::AccountKind,
        session_id::generate_session_id,
        token::Principal,
        validation,
    },
    store::NewCredential,
};

#[derive(ToSchema, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FacilityManagerSignup {
    pub password: String,
    pub dogrunmg_name: String,
    pub email: String,
}

/// Adds regular facility managers to an existing organization.
pub struct FacilityManagerProvisioning {
    context: ProvisioningContext,
}

impl FacilityManagerProvisioning {
    #[must_use]
    pub fn new(context: ProvisioningContext) -> Self {
        Self { context }
    }

    /// Create a manager inside the organization of `admin`.
    ///
    /// # Errors
    /// `InvalidInput` before any I/O, `NotFound` if the admin has no organization,
    /// `AlreadyRegistered` for a taken email, otherwise hash/store/sign failures.
    pub async fn provision(
        &self,
        admin: &Principal,
        request: &FacilityManagerSignup,
    ) -> AuthResult<Provisioned> {
        let email = validation::email(&request.email)?;
        let name = validation::required("dogrunmgName", &request.dogrunmg_name)?;
        let password = validation::password(&request.password)?;

        let organization_id = self.context.store().organization_of(admin.subject_id).await?;

        let password_hash = self.context.hasher().hash(password).await?;
        let session_id = generate_session_id()?;
        let credential = NewCredential {
            email: Some(email),
            phone_number: None,
            password_hash,
        };
        self.context
            .ensure_unregistered(AccountKind::FacilityManager, &credential.identifiers())
            .await?;

        let steps = [
            ProvisionStep::CreateFacilityManager {
                name: name.to_string(),
                organization: OrganizationRef::Existing(organization_id),
                is_admin: false,
            },
            ProvisionStep::CreateIdentityLink {
                kind: AccountKind::FacilityManager,
                session_id: session_id.clone(),
            },
            ProvisionStep::CreateCredential {
                kind: AccountKind::FacilityManager,
                credential,
            },
        ];
        let provisioned = self
            .context
            .commit_and_issue(&steps, &session_id, AccountKind::FacilityManager.role(false))
            .await?;

        info!(
            subject_id = provisioned.subject_id,
            organization_id,
            created_by = admin.subject_id,
            "facility manager provisioned"
        );
        Ok(provisioned)
    }
}
