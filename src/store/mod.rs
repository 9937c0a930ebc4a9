//! Persistence seams for accounts, credentials and session slots.
//!
//! Every operation takes an explicit [`AccountKind`] which selects the backing
//! tables; there is one implementation per storage engine, not one per kind.

use async_trait::async_trait;
use std::fmt;

use crate::auth::{error::AuthResult, role::AccountKind};

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

pub use postgres::PgStore;

/// Grant type written for every credential created by this service.
pub const GRANT_TYPE_PASSWORD: &str = "PASSWORD";

/// The login identifier of a credential.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Identifier {
    Email(String),
    PhoneNumber(String),
}

impl Identifier {
    /// Human readable field name, used in duplicate errors.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::PhoneNumber(_) => "phone number",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Email(value) | Self::PhoneNumber(value) => value,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field())
    }
}

/// A password credential matched during login.
#[derive(Clone, Debug)]
pub struct CredentialRecord {
    /// Domain identity id (pet owner or facility manager), used as token subject.
    pub account_id: i64,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Clone, Debug, Default)]
pub struct NewCredential {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: String,
}

impl NewCredential {
    /// Identifiers this credential will occupy once written.
    #[must_use]
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut identifiers = Vec::with_capacity(2);
        if let Some(email) = &self.email {
            identifiers.push(Identifier::Email(email.clone()));
        }
        if let Some(phone) = &self.phone_number {
            identifiers.push(Identifier::PhoneNumber(phone.clone()));
        }
        identifiers
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewOrganization {
    pub name: String,
    pub contact_email: String,
    pub phone_number: String,
    pub address: String,
    pub description: Option<String>,
}

/// The session slot of every account.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current session id, `None` when revoked.
    ///
    /// # Errors
    /// `NotFound` if the account has no identity link, `Store` on I/O failure.
    async fn current_session_id(
        &self,
        account_id: i64,
        kind: AccountKind,
    ) -> AuthResult<Option<String>>;

    /// Overwrite the session slot and stamp the login time.
    ///
    /// # Errors
    /// `NotFound` if the account has no identity link, `Store` on I/O failure.
    async fn set_session_id(
        &self,
        account_id: i64,
        kind: AccountKind,
        session_id: &str,
    ) -> AuthResult<()>;

    /// Clear the session slot. Clearing an empty slot is not an error.
    ///
    /// # Errors
    /// `Store` on I/O failure.
    async fn clear_session_id(&self, account_id: i64, kind: AccountKind) -> AuthResult<()>;
}

/// Lookups over password credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn count_password_credentials(
        &self,
        kind: AccountKind,
        identifier: &Identifier,
    ) -> AuthResult<i64>;

    async fn find_password_credentials(
        &self,
        kind: AccountKind,
        identifier: &Identifier,
    ) -> AuthResult<Vec<CredentialRecord>>;

    /// Organization a facility manager belongs to.
    ///
    /// # Errors
    /// `NotFound` if the manager does not exist.
    async fn organization_of(&self, facility_manager_id: i64) -> AuthResult<i64>;
}

/// One open write transaction. Dropping it without `commit` discards every write.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn insert_organization(&mut self, organization: &NewOrganization) -> AuthResult<i64>;

    async fn insert_pet_owner(&mut self, name: &str) -> AuthResult<i64>;

    async fn insert_facility_manager(
        &mut self,
        name: &str,
        organization_id: i64,
        is_admin: bool,
    ) -> AuthResult<i64>;

    /// Returns the id of the new identity link (auth record).
    async fn insert_identity_link(
        &mut self,
        kind: AccountKind,
        identity_id: i64,
        session_id: &str,
    ) -> AuthResult<i64>;

    async fn insert_credential(
        &mut self,
        kind: AccountKind,
        link_id: i64,
        credential: &NewCredential,
    ) -> AuthResult<i64>;

    async fn commit(self: Box<Self>) -> AuthResult<()>;

    async fn rollback(self: Box<Self>) -> AuthResult<()>;
}

/// Everything the service needs from storage.
#[async_trait]
pub trait AccountStore: SessionStore + CredentialStore {
    async fn begin(&self) -> AuthResult<Box<dyn UnitOfWork>>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> AuthResult<()>;
}
