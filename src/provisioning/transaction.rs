//! Ordered, all-or-nothing writes for account provisioning.
//!
//! Each step may consume the primary key produced by an earlier step (organization →
//! facility manager → identity link → credential). Any step error or panic rolls the
//! whole transaction back; only a clean run commits.

use anyhow::anyhow;
use futures::FutureExt;
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};
use tracing::{debug, error, warn};

use crate::{
    auth::{
        error::{AuthError, AuthResult},
        role::AccountKind,
    },
    store::{AccountStore, NewCredential, NewOrganization, UnitOfWork},
};

/// Which organization a new facility manager joins.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrganizationRef {
    /// The one created earlier in the same run.
    Created,
    Existing(i64),
}

#[derive(Clone, Debug)]
pub enum ProvisionStep {
    CreateOrganization(NewOrganization),
    CreatePetOwner {
        name: String,
    },
    CreateFacilityManager {
        name: String,
        organization: OrganizationRef,
        is_admin: bool,
    },
    /// Links the most recently created identity to a session slot.
    CreateIdentityLink {
        kind: AccountKind,
        session_id: String,
    },
    /// Attaches a credential to the most recently created identity link.
    CreateCredential {
        kind: AccountKind,
        credential: NewCredential,
    },
}

impl ProvisionStep {
    const fn name(&self) -> &'static str {
        match self {
            Self::CreateOrganization(_) => "create_organization",
            Self::CreatePetOwner { .. } => "create_pet_owner",
            Self::CreateFacilityManager { .. } => "create_facility_manager",
            Self::CreateIdentityLink { .. } => "create_identity_link",
            Self::CreateCredential { .. } => "create_credential",
        }
    }
}

/// Primary keys generated during a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProvisionKeys {
    pub organization_id: Option<i64>,
    pub identity_id: Option<i64>,
    pub link_id: Option<i64>,
    pub credential_id: Option<i64>,
}

fn missing_key(step: &ProvisionStep, key: &str) -> AuthError {
    AuthError::store(anyhow!("step {} requires a {key} from an earlier step", step.name()))
}

pub struct TransactionCoordinator {
    store: Arc<dyn AccountStore>,
}

impl TransactionCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Run `steps` in order inside one transaction.
    ///
    /// # Errors
    /// Returns the first failing step's error after rolling back. A panicking step is
    /// rolled back and reported as a store failure.
    pub async fn run_atomically(&self, steps: &[ProvisionStep]) -> AuthResult<ProvisionKeys> {
        let mut uow = self.store.begin().await?;

        let outcome = AssertUnwindSafe(apply_steps(uow.as_mut(), steps))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(keys)) => {
                uow.commit().await?;
                debug!(steps = steps.len(), "provisioning transaction committed");
                Ok(keys)
            }
            Ok(Err(err)) => {
                rollback(uow).await;
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "provisioning step panicked");
                rollback(uow).await;
                Err(AuthError::store(anyhow!("provisioning step panicked: {message}")))
            }
        }
    }
}

async fn apply_steps(
    uow: &mut dyn UnitOfWork,
    steps: &[ProvisionStep],
) -> AuthResult<ProvisionKeys> {
    let mut keys = ProvisionKeys::default();

    for step in steps {
        match step {
            ProvisionStep::CreateOrganization(organization) => {
                keys.organization_id = Some(uow.insert_organization(organization).await?);
            }
            ProvisionStep::CreatePetOwner { name } => {
                keys.identity_id = Some(uow.insert_pet_owner(name).await?);
            }
            ProvisionStep::CreateFacilityManager {
                name,
                organization,
                is_admin,
            } => {
                let organization_id = match organization {
                    OrganizationRef::Created => keys
                        .organization_id
                        .ok_or_else(|| missing_key(step, "organization id"))?,
                    OrganizationRef::Existing(id) => *id,
                };
                keys.identity_id = Some(
                    uow.insert_facility_manager(name, organization_id, *is_admin)
                        .await?,
                );
            }
            ProvisionStep::CreateIdentityLink { kind, session_id } => {
                let identity_id = keys
                    .identity_id
                    .ok_or_else(|| missing_key(step, "identity id"))?;
                keys.link_id = Some(
                    uow.insert_identity_link(*kind, identity_id, session_id)
                        .await?,
                );
            }
            ProvisionStep::CreateCredential { kind, credential } => {
                let link_id = keys
                    .link_id
                    .ok_or_else(|| missing_key(step, "identity link id"))?;
                keys.credential_id = Some(uow.insert_credential(*kind, link_id, credential).await?);
            }
        }
    }

    Ok(keys)
}

async fn rollback(uow: Box<dyn UnitOfWork>) {
    if let Err(err) = uow.rollback().await {
        warn!(error = %err, "failed to roll back provisioning transaction");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
