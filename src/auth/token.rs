//! Bearer tokens: HS256 JWTs carrying `{sub, sid, role, exp}`.
//!
//! Validation walks a fixed sequence of stages. Expiry is checked before the session
//! slot is read, so a dead token never costs a database round trip.

use anyhow::anyhow;
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

use super::{
    error::{AuthError, AuthResult},
    role::{AccountKind, Role},
};
use crate::store::SessionStore;

const SECONDS_PER_HOUR: u64 = 60 * 60;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Domain identity id, decimal encoded.
    pub sub: String,
    /// Session id that must still occupy the account's session slot.
    pub sid: String,
    pub role: i32,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// The caller behind an accepted token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: i64,
    pub session_id: String,
    pub role: Role,
    pub account_kind: AccountKind,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    expiry_seconds: u64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, expiry_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            expiry_seconds: expiry_hours.saturating_mul(SECONDS_PER_HOUR),
        }
    }

    /// Sign a token for `subject_id` bound to `session_id`.
    ///
    /// # Errors
    /// Returns `SigningFailed` if the claims cannot be encoded.
    pub fn issue(&self, subject_id: i64, session_id: &str, role: Role) -> AuthResult<String> {
        let claims = Claims {
            sub: subject_id.to_string(),
            sid: session_id.to_string(),
            role: role.code(),
            exp: get_current_timestamp().saturating_add(self.expiry_seconds),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|err| AuthError::SigningFailed(anyhow!(err)))
    }
}

/// Stages a token passes through before it is accepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Parsed,
    SignatureVerified,
    ExpiryChecked,
    SessionMatched,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::SignatureVerified => "signature_verified",
            Self::ExpiryChecked => "expiry_checked",
            Self::SessionMatched => "session_matched",
        };
        f.write_str(name)
    }
}

pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    sessions: Arc<dyn SessionStore>,
}

impl TokenValidator {
    #[must_use]
    pub fn new(secret: &SecretString, sessions: Arc<dyn SessionStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is its own stage with its own rejection.
        validation.validate_exp = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
            sessions,
        }
    }

    /// Validate the raw `Authorization` header value.
    ///
    /// # Errors
    /// Returns the rejection of the first failing stage.
    pub async fn validate_header(&self, authorization: Option<&str>) -> AuthResult<Principal> {
        let token = parse_bearer(authorization).inspect_err(|err| reject(Stage::Parsed, err))?;
        self.validate(token).await
    }

    /// Validate a bare token.
    ///
    /// # Errors
    /// `TokenInvalid`, `TokenExpired` or `SessionRevoked` for the stage that failed; a
    /// store failure while reading the session slot is passed through.
    pub async fn validate(&self, token: &str) -> AuthResult<Principal> {
        let claims = self
            .verify_signature(token)
            .inspect_err(|err| reject(Stage::SignatureVerified, err))?;

        check_expiry(&claims, get_current_timestamp())
            .inspect_err(|err| reject(Stage::ExpiryChecked, err))?;

        let principal = self
            .match_session(claims)
            .await
            .inspect_err(|err| reject(Stage::SessionMatched, err))?;

        debug!(
            subject_id = principal.subject_id,
            role = %principal.role,
            "token accepted"
        );
        Ok(principal)
    }

    fn verify_signature(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::TokenInvalid)
    }

    async fn match_session(&self, claims: Claims) -> AuthResult<Principal> {
        let subject_id: i64 = claims.sub.parse().map_err(|_| AuthError::TokenInvalid)?;
        let role = Role::from_code(claims.role).ok_or(AuthError::TokenInvalid)?;
        let account_kind = role.account_kind().ok_or(AuthError::SessionRevoked)?;

        let current = match self
            .sessions
            .current_session_id(subject_id, account_kind)
            .await
        {
            Ok(current) => current,
            Err(AuthError::NotFound) => return Err(AuthError::SessionRevoked),
            Err(err) => return Err(err),
        };

        if current.as_deref() != Some(claims.sid.as_str()) {
            return Err(AuthError::SessionRevoked);
        }

        Ok(Principal {
            subject_id,
            session_id: claims.sid,
            role,
            account_kind,
        })
    }
}

fn parse_bearer(authorization: Option<&str>) -> AuthResult<&str> {
    let value = authorization.ok_or(AuthError::TokenMissing)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::TokenMissing)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::TokenMissing);
    }
    Ok(token)
}

fn check_expiry(claims: &Claims, now: u64) -> AuthResult<()> {
    if claims.exp < now {
        return Err(AuthError::TokenExpired);
    }
    Ok(())
}

fn reject(stage: Stage, err: &AuthError) {
    warn!(stage = %stage, reason = %err, "bearer token rejected");
}
