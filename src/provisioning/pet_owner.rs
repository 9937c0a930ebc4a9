use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::{ProvisionStep, Provisioned, ProvisioningContext};
use crate::{
    auth::{
        error::AuthResult,
        role::{AccountKind, Role},
        session_id::generate_session_id,
        validation,
    },
    store::{Identifier, NewCredential},
};

#[derive(ToSchema, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PetOwnerSignup {
    pub password: String,
    pub dog_owner_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

pub struct PetOwnerProvisioning {
    context: ProvisioningContext,
}

impl PetOwnerProvisioning {
    #[must_use]
    pub fn new(context: ProvisioningContext) -> Self {
        Self { context }
    }

    /// Create a pet owner with its auth record and password credential.
    ///
    /// # Errors
    /// `InvalidInput` (including both or neither of email and phone) before any I/O,
    /// `AlreadyRegistered` for a taken identifier, otherwise hash/store/sign failures.
    pub async fn provision(&self, request: &PetOwnerSignup) -> AuthResult<Provisioned> {
        let identifier =
            validation::email_xor_phone(request.email.as_deref(), request.phone_number.as_deref())?;
        let name = validation::required("dogOwnerName", &request.dog_owner_name)?;
        let password = validation::password(&request.password)?;

        let password_hash = self.context.hasher().hash(password).await?;
        let session_id = generate_session_id()?;

        let credential = match identifier {
            Identifier::Email(email) => NewCredential {
                email: Some(email),
                phone_number: None,
                password_hash,
            },
            Identifier::PhoneNumber(phone) => NewCredential {
                email: None,
                phone_number: Some(phone),
                password_hash,
            },
        };
        self.context
            .ensure_unregistered(AccountKind::PetOwner, &credential.identifiers())
            .await?;

        let steps = [
            ProvisionStep::CreatePetOwner {
                name: name.to_string(),
            },
            ProvisionStep::CreateIdentityLink {
                kind: AccountKind::PetOwner,
                session_id: session_id.clone(),
            },
            ProvisionStep::CreateCredential {
                kind: AccountKind::PetOwner,
                credential,
            },
        ];
        let provisioned = self
            .context
            .commit_and_issue(&steps, &session_id, Role::PetOwner)
            .await?;

        info!(subject_id = provisioned.subject_id, "pet owner provisioned");
        Ok(provisioned)
    }
}
