//! In-memory store used by unit tests.
//!
//! A unit of work edits a private copy of the tables and publishes it on commit, so
//! an abandoned transaction leaves nothing behind. Credential identifiers are unique
//! per account kind among password grants, mirroring the partial unique indexes.

use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use super::{
    AccountStore, CredentialRecord, CredentialStore, Identifier, NewCredential, NewOrganization,
    SessionStore, UnitOfWork, GRANT_TYPE_PASSWORD,
};
use crate::auth::{
    error::{AuthError, AuthResult},
    role::AccountKind,
};

#[derive(Clone, Debug)]
struct FacilityManagerRow {
    id: i64,
    organization_id: i64,
    is_admin: bool,
}

#[derive(Clone, Debug)]
struct LinkRow {
    id: i64,
    kind: AccountKind,
    identity_id: i64,
    session_id: Option<String>,
}

#[derive(Clone, Debug)]
struct CredentialRow {
    kind: AccountKind,
    link_id: i64,
    email: Option<String>,
    phone_number: Option<String>,
    password_hash: String,
    grant_type: &'static str,
}

impl CredentialRow {
    fn matches(&self, kind: AccountKind, identifier: &Identifier) -> bool {
        self.kind == kind
            && self.grant_type == GRANT_TYPE_PASSWORD
            && match identifier {
                Identifier::Email(email) => self.email.as_deref() == Some(email),
                Identifier::PhoneNumber(phone) => self.phone_number.as_deref() == Some(phone),
            }
    }
}

#[derive(Clone, Debug, Default)]
struct Tables {
    next_id: i64,
    organizations: Vec<(i64, NewOrganization)>,
    pet_owners: Vec<(i64, String)>,
    facility_managers: Vec<FacilityManagerRow>,
    links: Vec<LinkRow>,
    credentials: Vec<CredentialRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn link(&self, kind: AccountKind, identity_id: i64) -> Option<&LinkRow> {
        self.links
            .iter()
            .find(|link| link.kind == kind && link.identity_id == identity_id)
    }

    fn link_mut(&mut self, kind: AccountKind, identity_id: i64) -> Option<&mut LinkRow> {
        self.links
            .iter_mut()
            .find(|link| link.kind == kind && link.identity_id == identity_id)
    }
}

/// Number of rows per table.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct RowCounts {
    pub organizations: usize,
    pub pet_owners: usize,
    pub facility_managers: usize,
    pub identity_links: usize,
    pub credentials: usize,
}

impl RowCounts {
    pub(crate) fn total(&self) -> usize {
        self.organizations
            + self.pet_owners
            + self.facility_managers
            + self.identity_links
            + self.credentials
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_credential_insert: AtomicBool,
    panic_on_credential_insert: AtomicBool,
    fail_ping: AtomicBool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    session_lookups: Arc<AtomicUsize>,
    faults: Arc<Faults>,
}

fn lock(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// How many times a session slot has been read.
    pub(crate) fn session_lookups(&self) -> usize {
        self.session_lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn row_counts(&self) -> RowCounts {
        let tables = lock(&self.tables);
        RowCounts {
            organizations: tables.organizations.len(),
            pet_owners: tables.pet_owners.len(),
            facility_managers: tables.facility_managers.len(),
            identity_links: tables.links.len(),
            credentials: tables.credentials.len(),
        }
    }

    /// Stored session slot, bypassing the lookup counter.
    pub(crate) fn stored_session_id(&self, kind: AccountKind, identity_id: i64) -> Option<String> {
        lock(&self.tables)
            .link(kind, identity_id)
            .and_then(|link| link.session_id.clone())
    }

    pub(crate) fn fail_credential_insert(&self) {
        self.faults
            .fail_credential_insert
            .store(true, Ordering::SeqCst);
    }

    pub(crate) fn panic_on_credential_insert(&self) {
        self.faults
            .panic_on_credential_insert
            .store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_ping(&self) {
        self.faults.fail_ping.store(true, Ordering::SeqCst);
    }

    /// Attach a second password credential to an existing account, ignoring the
    /// uniqueness rule.
    pub(crate) fn seed_duplicate_credential(
        &self,
        kind: AccountKind,
        identity_id: i64,
        email: &str,
        password_hash: &str,
    ) {
        let mut tables = lock(&self.tables);
        let Some(link_id) = tables.link(kind, identity_id).map(|link| link.id) else {
            return;
        };
        tables.credentials.push(CredentialRow {
            kind,
            link_id,
            email: Some(email.to_string()),
            phone_number: None,
            password_hash: password_hash.to_string(),
            grant_type: GRANT_TYPE_PASSWORD,
        });
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn current_session_id(
        &self,
        account_id: i64,
        kind: AccountKind,
    ) -> AuthResult<Option<String>> {
        self.session_lookups.fetch_add(1, Ordering::SeqCst);
        lock(&self.tables)
            .link(kind, account_id)
            .map(|link| link.session_id.clone())
            .ok_or(AuthError::NotFound)
    }

    async fn set_session_id(
        &self,
        account_id: i64,
        kind: AccountKind,
        session_id: &str,
    ) -> AuthResult<()> {
        let mut tables = lock(&self.tables);
        let link = tables
            .link_mut(kind, account_id)
            .ok_or(AuthError::NotFound)?;
        link.session_id = Some(session_id.to_string());
        Ok(())
    }

    async fn clear_session_id(&self, account_id: i64, kind: AccountKind) -> AuthResult<()> {
        if let Some(link) = lock(&self.tables).link_mut(kind, account_id) {
            link.session_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn count_password_credentials(
        &self,
        kind: AccountKind,
        identifier: &Identifier,
    ) -> AuthResult<i64> {
        let tables = lock(&self.tables);
        let count = tables
            .credentials
            .iter()
            .filter(|credential| credential.matches(kind, identifier))
            .count();
        i64::try_from(count).map_err(AuthError::store)
    }

    async fn find_password_credentials(
        &self,
        kind: AccountKind,
        identifier: &Identifier,
    ) -> AuthResult<Vec<CredentialRecord>> {
        let tables = lock(&self.tables);
        let records = tables
            .credentials
            .iter()
            .filter(|credential| credential.matches(kind, identifier))
            .filter_map(|credential| {
                let link = tables.links.iter().find(|link| link.id == credential.link_id)?;
                let is_admin = tables
                    .facility_managers
                    .iter()
                    .any(|manager| {
                        kind == AccountKind::FacilityManager
                            && manager.id == link.identity_id
                            && manager.is_admin
                    });
                Some(CredentialRecord {
                    account_id: link.identity_id,
                    password_hash: credential.password_hash.clone(),
                    is_admin,
                })
            })
            .collect();
        Ok(records)
    }

    async fn organization_of(&self, facility_manager_id: i64) -> AuthResult<i64> {
        lock(&self.tables)
            .facility_managers
            .iter()
            .find(|manager| manager.id == facility_manager_id)
            .map(|manager| manager.organization_id)
            .ok_or(AuthError::NotFound)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn begin(&self) -> AuthResult<Box<dyn UnitOfWork>> {
        let working = lock(&self.tables).clone();
        Ok(Box::new(MemoryUnitOfWork {
            target: Arc::clone(&self.tables),
            working,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn ping(&self) -> AuthResult<()> {
        if self.faults.fail_ping.load(Ordering::SeqCst) {
            return Err(AuthError::store(anyhow!("connection refused")));
        }
        Ok(())
    }
}

struct MemoryUnitOfWork {
    target: Arc<Mutex<Tables>>,
    working: Tables,
    faults: Arc<Faults>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_organization(&mut self, organization: &NewOrganization) -> AuthResult<i64> {
        let id = self.working.next_id();
        self.working.organizations.push((id, organization.clone()));
        Ok(id)
    }

    async fn insert_pet_owner(&mut self, name: &str) -> AuthResult<i64> {
        let id = self.working.next_id();
        self.working.pet_owners.push((id, name.to_string()));
        Ok(id)
    }

    async fn insert_facility_manager(
        &mut self,
        _name: &str,
        organization_id: i64,
        is_admin: bool,
    ) -> AuthResult<i64> {
        if !self
            .working
            .organizations
            .iter()
            .any(|(id, _)| *id == organization_id)
        {
            return Err(AuthError::store(anyhow!(
                "organization {organization_id} does not exist"
            )));
        }
        let id = self.working.next_id();
        self.working.facility_managers.push(FacilityManagerRow {
            id,
            organization_id,
            is_admin,
        });
        Ok(id)
    }

    async fn insert_identity_link(
        &mut self,
        kind: AccountKind,
        identity_id: i64,
        session_id: &str,
    ) -> AuthResult<i64> {
        if self.working.link(kind, identity_id).is_some() {
            return Err(AuthError::store(anyhow!(
                "identity {identity_id} already has an auth record"
            )));
        }
        let id = self.working.next_id();
        self.working.links.push(LinkRow {
            id,
            kind,
            identity_id,
            session_id: Some(session_id.to_string()),
        });
        Ok(id)
    }

    async fn insert_credential(
        &mut self,
        kind: AccountKind,
        link_id: i64,
        credential: &NewCredential,
    ) -> AuthResult<i64> {
        if self.faults.panic_on_credential_insert.load(Ordering::SeqCst) {
            panic!("credential insert blew up");
        }
        if self.faults.fail_credential_insert.load(Ordering::SeqCst) {
            return Err(AuthError::store(anyhow!("credential insert failed")));
        }
        for identifier in credential.identifiers() {
            if self
                .working
                .credentials
                .iter()
                .any(|existing| existing.matches(kind, &identifier))
            {
                return Err(AuthError::AlreadyRegistered(identifier.field()));
            }
        }
        let id = self.working.next_id();
        self.working.credentials.push(CredentialRow {
            kind,
            link_id,
            email: credential.email.clone(),
            phone_number: credential.phone_number.clone(),
            password_hash: credential.password_hash.clone(),
            grant_type: GRANT_TYPE_PASSWORD,
        });
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> AuthResult<()> {
        let Self {
            target, working, ..
        } = *self;
        *lock(&target) = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AuthResult<()> {
        Ok(())
    }
}
