use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::{OrganizationRef, ProvisionStep, Provisioned, ProvisioningContext};
use crate::{
    auth::{
        error::AuthResult, role::AccountKind, session_id::generate_session_id, validation,
    },
    store::{NewCredential, NewOrganization},
};

/// Display name given to the first manager of every organization.
const ADMIN_NAME: &str = "admin";

#[derive(ToSchema, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationContract {
    pub organization_name: String,
    /// Also the admin manager's login email.
    pub contact_email: String,
    pub phone_number: String,
    pub address: String,
    pub description: Option<String>,
    pub password: String,
}

/// Creates an organization together with its admin facility manager.
pub struct OrganizationProvisioning {
    context: ProvisioningContext,
}

impl OrganizationProvisioning {
    #[must_use]
    pub fn new(context: ProvisioningContext) -> Self {
        Self { context }
    }

    /// # Errors
    /// `InvalidInput` before any I/O, `AlreadyRegistered` when the contact email is
    /// already a manager login, otherwise hash/store/sign failures.
    pub async fn provision(&self, request: &OrganizationContract) -> AuthResult<Provisioned> {
        let organization_name = validation::required("organizationName", &request.organization_name)?;
        let contact_email = validation::email(&request.contact_email)?;
        let phone_number = validation::phone_number(&request.phone_number)?;
        let address = validation::required("address", &request.address)?;
        let password = validation::password(&request.password)?;
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .map(str::to_string);

        let password_hash = self.context.hasher().hash(password).await?;
        let session_id = generate_session_id()?;
        let credential = NewCredential {
            email: Some(contact_email.clone()),
            phone_number: None,
            password_hash,
        };
        self.context
            .ensure_unregistered(AccountKind::FacilityManager, &credential.identifiers())
            .await?;

        let steps = [
            ProvisionStep::CreateOrganization(NewOrganization {
                name: organization_name.to_string(),
                contact_email,
                phone_number,
                address: address.to_string(),
                description,
            }),
            ProvisionStep::CreateFacilityManager {
                name: ADMIN_NAME.to_string(),
                organization: OrganizationRef::Created,
                is_admin: true,
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
            .commit_and_issue(&steps, &session_id, AccountKind::FacilityManager.role(true))
            .await?;

        info!(
            subject_id = provisioned.subject_id,
            organization = organization_name,
            "organization contracted"
        );
        Ok(provisioned)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        auth::{error::AuthError, role::Role},
        provisioning::testing::harness,
    };
    use anyhow::Result;

    pub(crate) fn contract(email: &str) -> OrganizationContract {
        OrganizationContract {
            organization_name: "Shibuya Dog Run".to_string(),
            contact_email: email.to_string(),
            phone_number: "03-1234-5678".to_string(),
            address: "Shibuya, Tokyo".to_string(),
            description: Some("Open every day".to_string()),
            password: "Secr3t!".to_string(),
        }
    }

    #[tokio::test]
    async fn first_manager_is_admin() -> Result<()> {
        let h = harness();
        let provisioned = OrganizationProvisioning::new(h.context.clone())
            .provision(&contract("org@x.com"))
            .await?;

        assert_eq!(provisioned.role, Role::FacilityManagerAdmin);
        let principal = h.validator.validate(&provisioned.access_token).await?;
        assert_eq!(principal.role, Role::FacilityManagerAdmin);
        assert_eq!(principal.account_kind, AccountKind::FacilityManager);

        let counts = h.store.row_counts();
        assert_eq!(counts.organizations, 1);
        assert_eq!(counts.facility_managers, 1);
        assert_eq!(counts.identity_links, 1);
        assert_eq!(counts.credentials, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failure_in_last_step_leaves_no_organization() {
        let h = harness();
        h.store.fail_credential_insert();

        let err = OrganizationProvisioning::new(h.context.clone())
            .provision(&contract("org@x.com"))
            .await
            .err();

        assert!(err.is_some());
        assert_eq!(h.store.row_counts().total(), 0);
    }

    #[tokio::test]
    async fn contact_email_must_be_free() -> Result<()> {
        let h = harness();
        let service = OrganizationProvisioning::new(h.context.clone());
        service.provision(&contract("org@x.com")).await?;

        let err = service.provision(&contract("org@x.com")).await.err();
        assert!(matches!(err, Some(AuthError::AlreadyRegistered("email"))));
        assert_eq!(h.store.row_counts().organizations, 1);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_fields_write_nothing() {
        let h = harness();
        let service = OrganizationProvisioning::new(h.context.clone());

        let mut bad_phone = contract("org@x.com");
        bad_phone.phone_number = "call me".to_string();
        let mut no_address = contract("org@x.com");
        no_address.address = String::new();

        for request in [bad_phone, no_address] {
            let err = service.provision(&request).await.err();
            assert!(matches!(err, Some(AuthError::InvalidInput(_))));
        }
        assert_eq!(h.store.row_counts().total(), 0);
    }
}
