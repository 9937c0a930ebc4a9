//! PostgreSQL implementation of the store traits.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Postgres, Row, Transaction};
use tracing::{info_span, warn, Instrument};

use super::{
    AccountStore, CredentialRecord, CredentialStore, Identifier, NewCredential, NewOrganization,
    SessionStore, UnitOfWork, GRANT_TYPE_PASSWORD,
};
use crate::auth::{
    error::{AuthError, AuthResult},
    role::AccountKind,
};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Identifier behind a unique violation, read from the index name.
fn conflicting_field(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Database(db_err)
            if db_err
                .constraint()
                .is_some_and(|constraint| constraint.contains("phone")) =>
        {
            "phone number"
        }
        _ => "email",
    }
}

fn map_write_error(err: sqlx::Error, context: &'static str) -> AuthError {
    if is_unique_violation(&err) {
        return AuthError::AlreadyRegistered(conflicting_field(&err));
    }
    AuthError::store(anyhow::Error::new(err).context(context))
}

fn map_read_error(err: sqlx::Error, context: &'static str) -> AuthError {
    AuthError::store(anyhow::Error::new(err).context(context))
}

const fn select_session_query(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::PetOwner => "SELECT session_id FROM pet_owner_auth WHERE pet_owner_id = $1",
        AccountKind::FacilityManager => {
            "SELECT session_id FROM facility_manager_auth WHERE facility_manager_id = $1"
        }
    }
}

const fn update_session_query(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::PetOwner => {
            r"
            UPDATE pet_owner_auth
            SET session_id = $2, login_at = NOW()
            WHERE pet_owner_id = $1
            RETURNING auth_id
            "
        }
        AccountKind::FacilityManager => {
            r"
            UPDATE facility_manager_auth
            SET session_id = $2, login_at = NOW()
            WHERE facility_manager_id = $1
            RETURNING auth_id
            "
        }
    }
}

const fn credential_login_query(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::PetOwner => {
            "UPDATE pet_owner_credentials SET login_at = NOW() WHERE auth_id = $1"
        }
        AccountKind::FacilityManager => {
            "UPDATE facility_manager_credentials SET login_at = NOW() WHERE auth_id = $1"
        }
    }
}

const fn clear_session_query(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::PetOwner => {
            "UPDATE pet_owner_auth SET session_id = NULL WHERE pet_owner_id = $1"
        }
        AccountKind::FacilityManager => {
            "UPDATE facility_manager_auth SET session_id = NULL WHERE facility_manager_id = $1"
        }
    }
}

fn count_credentials_query(kind: AccountKind, identifier: &Identifier) -> AuthResult<&'static str> {
    match (kind, identifier) {
        (AccountKind::PetOwner, Identifier::Email(_)) => Ok(
            "SELECT COUNT(*) AS total FROM pet_owner_credentials WHERE email = $1 AND grant_type = $2",
        ),
        (AccountKind::PetOwner, Identifier::PhoneNumber(_)) => Ok(
            "SELECT COUNT(*) AS total FROM pet_owner_credentials WHERE phone_number = $1 AND grant_type = $2",
        ),
        (AccountKind::FacilityManager, Identifier::Email(_)) => Ok(
            "SELECT COUNT(*) AS total FROM facility_manager_credentials WHERE email = $1 AND grant_type = $2",
        ),
        (AccountKind::FacilityManager, Identifier::PhoneNumber(_)) => Err(email_only()),
    }
}

fn find_credentials_query(kind: AccountKind, identifier: &Identifier) -> AuthResult<&'static str> {
    match (kind, identifier) {
        (AccountKind::PetOwner, Identifier::Email(_)) => Ok(r"
            SELECT a.pet_owner_id AS account_id, c.password_hash, FALSE AS is_admin
            FROM pet_owner_credentials c
            JOIN pet_owner_auth a ON a.auth_id = c.auth_id
            WHERE c.email = $1 AND c.grant_type = $2
        "),
        (AccountKind::PetOwner, Identifier::PhoneNumber(_)) => Ok(r"
            SELECT a.pet_owner_id AS account_id, c.password_hash, FALSE AS is_admin
            FROM pet_owner_credentials c
            JOIN pet_owner_auth a ON a.auth_id = c.auth_id
            WHERE c.phone_number = $1 AND c.grant_type = $2
        "),
        (AccountKind::FacilityManager, Identifier::Email(_)) => Ok(r"
            SELECT a.facility_manager_id AS account_id, c.password_hash, m.is_admin
            FROM facility_manager_credentials c
            JOIN facility_manager_auth a ON a.auth_id = c.auth_id
            JOIN facility_managers m ON m.facility_manager_id = a.facility_manager_id
            WHERE c.email = $1 AND c.grant_type = $2
        "),
        (AccountKind::FacilityManager, Identifier::PhoneNumber(_)) => Err(email_only()),
    }
}

fn email_only() -> AuthError {
    AuthError::InvalidInput("facility managers sign in with an email address".to_string())
}

#[async_trait]
impl SessionStore for PgStore {
    async fn current_session_id(
        &self,
        account_id: i64,
        kind: AccountKind,
    ) -> AuthResult<Option<String>> {
        let query = select_session_query(kind);
        let row = sqlx::query(query)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .map_err(|err| map_read_error(err, "failed to read session id"))?;

        let row = row.ok_or(AuthError::NotFound)?;
        Ok(row.get::<Option<String>, _>("session_id"))
    }

    async fn set_session_id(
        &self,
        account_id: i64,
        kind: AccountKind,
        session_id: &str,
    ) -> AuthResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| map_read_error(err, "begin login transaction"))?;

        let query = update_session_query(kind);
        let row = sqlx::query(query)
            .bind(account_id)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .instrument(query_span("UPDATE", query))
            .await
            .map_err(|err| map_read_error(err, "failed to update session id"))?;

        let Some(row) = row else {
            if let Err(err) = tx.rollback().await {
                warn!(error = %err, "failed to roll back login transaction");
            }
            return Err(AuthError::NotFound);
        };
        let auth_id: i64 = row.get("auth_id");

        let query = credential_login_query(kind);
        sqlx::query(query)
            .bind(auth_id)
            .execute(&mut *tx)
            .instrument(query_span("UPDATE", query))
            .await
            .map_err(|err| map_read_error(err, "failed to stamp credential login"))?;

        tx.commit()
            .await
            .map_err(|err| map_read_error(err, "commit login transaction"))
    }

    async fn clear_session_id(&self, account_id: i64, kind: AccountKind) -> AuthResult<()> {
        let query = clear_session_query(kind);
        sqlx::query(query)
            .bind(account_id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .map_err(|err| map_read_error(err, "failed to clear session id"))?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn count_password_credentials(
        &self,
        kind: AccountKind,
        identifier: &Identifier,
    ) -> AuthResult<i64> {
        let query = count_credentials_query(kind, identifier)?;
        let row = sqlx::query(query)
            .bind(identifier.value())
            .bind(GRANT_TYPE_PASSWORD)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .map_err(|err| map_read_error(err, "failed to count credentials"))?;
        Ok(row.get("total"))
    }

    async fn find_password_credentials(
        &self,
        kind: AccountKind,
        identifier: &Identifier,
    ) -> AuthResult<Vec<CredentialRecord>> {
        let query = find_credentials_query(kind, identifier)?;
        let rows = sqlx::query(query)
            .bind(identifier.value())
            .bind(GRANT_TYPE_PASSWORD)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .map_err(|err| map_read_error(err, "failed to look up credentials"))?;

        Ok(rows
            .into_iter()
            .map(|row| CredentialRecord {
                account_id: row.get("account_id"),
                password_hash: row.get("password_hash"),
                is_admin: row.get("is_admin"),
            })
            .collect())
    }

    async fn organization_of(&self, facility_manager_id: i64) -> AuthResult<i64> {
        let query = "SELECT organization_id FROM facility_managers WHERE facility_manager_id = $1";
        let row = sqlx::query(query)
            .bind(facility_manager_id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .map_err(|err| map_read_error(err, "failed to look up organization"))?;
        row.map(|row| row.get("organization_id"))
            .ok_or(AuthError::NotFound)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn begin(&self) -> AuthResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|err| map_read_error(err, "begin provisioning transaction"))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> AuthResult<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")
            .map_err(AuthError::Store)?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
            .map_err(AuthError::Store)
    }
}

/// Provisioning transaction. Dropping it uncommitted rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_organization(&mut self, organization: &NewOrganization) -> AuthResult<i64> {
        let query = r"
            INSERT INTO organizations
                (organization_name, contact_email, phone_number, address, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING organization_id
        ";
        let row = sqlx::query(query)
            .bind(&organization.name)
            .bind(&organization.contact_email)
            .bind(&organization.phone_number)
            .bind(&organization.address)
            .bind(organization.description.as_deref())
            .fetch_one(&mut *self.tx)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(|err| map_write_error(err, "failed to insert organization"))?;
        Ok(row.get("organization_id"))
    }

    async fn insert_pet_owner(&mut self, name: &str) -> AuthResult<i64> {
        let query = "INSERT INTO pet_owners (name) VALUES ($1) RETURNING pet_owner_id";
        let row = sqlx::query(query)
            .bind(name)
            .fetch_one(&mut *self.tx)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(|err| map_write_error(err, "failed to insert pet owner"))?;
        Ok(row.get("pet_owner_id"))
    }

    async fn insert_facility_manager(
        &mut self,
        name: &str,
        organization_id: i64,
        is_admin: bool,
    ) -> AuthResult<i64> {
        let query = r"
            INSERT INTO facility_managers (name, is_admin, organization_id)
            VALUES ($1, $2, $3)
            RETURNING facility_manager_id
        ";
        let row = sqlx::query(query)
            .bind(name)
            .bind(is_admin)
            .bind(organization_id)
            .fetch_one(&mut *self.tx)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(|err| map_write_error(err, "failed to insert facility manager"))?;
        Ok(row.get("facility_manager_id"))
    }

    async fn insert_identity_link(
        &mut self,
        kind: AccountKind,
        identity_id: i64,
        session_id: &str,
    ) -> AuthResult<i64> {
        let query = match kind {
            AccountKind::PetOwner => {
                r"
                INSERT INTO pet_owner_auth (pet_owner_id, session_id, login_at)
                VALUES ($1, $2, NOW())
                RETURNING auth_id
                "
            }
            AccountKind::FacilityManager => {
                r"
                INSERT INTO facility_manager_auth (facility_manager_id, session_id, login_at)
                VALUES ($1, $2, NOW())
                RETURNING auth_id
                "
            }
        };
        let row = sqlx::query(query)
            .bind(identity_id)
            .bind(session_id)
            .fetch_one(&mut *self.tx)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(|err| map_write_error(err, "failed to insert identity link"))?;
        Ok(row.get("auth_id"))
    }

    async fn insert_credential(
        &mut self,
        kind: AccountKind,
        link_id: i64,
        credential: &NewCredential,
    ) -> AuthResult<i64> {
        let row = match kind {
            AccountKind::PetOwner => {
                let query = r"
                    INSERT INTO pet_owner_credentials
                        (auth_id, email, phone_number, password_hash, grant_type, login_at)
                    VALUES ($1, $2, $3, $4, $5, NOW())
                    RETURNING credential_id
                ";
                sqlx::query(query)
                    .bind(link_id)
                    .bind(credential.email.as_deref())
                    .bind(credential.phone_number.as_deref())
                    .bind(&credential.password_hash)
                    .bind(GRANT_TYPE_PASSWORD)
                    .fetch_one(&mut *self.tx)
                    .instrument(query_span("INSERT", query))
                    .await
            }
            AccountKind::FacilityManager => {
                let email = credential.email.as_deref().ok_or_else(email_only)?;
                let query = r"
                    INSERT INTO facility_manager_credentials
                        (auth_id, email, password_hash, grant_type, login_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    RETURNING credential_id
                ";
                sqlx::query(query)
                    .bind(link_id)
                    .bind(email)
                    .bind(&credential.password_hash)
                    .bind(GRANT_TYPE_PASSWORD)
                    .fetch_one(&mut *self.tx)
                    .instrument(query_span("INSERT", query))
                    .await
            }
        }
        .map_err(|err| map_write_error(err, "failed to insert credential"))?;
        Ok(row.get("credential_id"))
    }

    async fn commit(self: Box<Self>) -> AuthResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| map_write_error(err, "commit provisioning transaction"))
    }

    async fn rollback(self: Box<Self>) -> AuthResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|err| map_read_error(err, "rollback provisioning transaction"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_queries_target_the_kind_table() {
        assert!(select_session_query(AccountKind::PetOwner).contains("pet_owner_auth"));
        assert!(
            select_session_query(AccountKind::FacilityManager).contains("facility_manager_auth")
        );
        assert!(clear_session_query(AccountKind::FacilityManager).contains("session_id = NULL"));
    }

    #[test]
    fn credential_queries_only_match_password_grants() -> anyhow::Result<()> {
        let email = Identifier::Email("a@x.com".to_string());
        let phone = Identifier::PhoneNumber("090-1234-5678".to_string());
        assert!(count_credentials_query(AccountKind::PetOwner, &phone)?.contains("phone_number"));
        assert!(find_credentials_query(AccountKind::FacilityManager, &email)?.contains("is_admin"));
        assert!(find_credentials_query(AccountKind::PetOwner, &email)?.contains("grant_type = $2"));
        Ok(())
    }

    #[test]
    fn facility_managers_have_no_phone_login() {
        let phone = Identifier::PhoneNumber("090-1234-5678".to_string());
        assert!(matches!(
            count_credentials_query(AccountKind::FacilityManager, &phone),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert_eq!(conflicting_field(&sqlx::Error::RowNotFound), "email");
        assert!(matches!(
            map_write_error(sqlx::Error::RowNotFound, "insert"),
            AuthError::Store(_)
        ));
    }
}
