//! Failure taxonomy shared by every auth component.

use thiserror::Error;

/// Whether a failure was caused by the caller or by the service itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Client,
    Server,
}

impl ErrorKind {
    /// Numeric suffix used in error codes (`<service>-<kind>`).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Client => 1,
            Self::Server => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed request body, including the email/phone XOR rule.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} is already registered")]
    AlreadyRegistered(&'static str),

    /// No password credential matches the supplied identifier.
    #[error("invalid credentials")]
    NotFound,

    #[error("invalid credentials")]
    AuthenticationFailed,

    /// More than one password credential shares an identifier.
    #[error("account data is inconsistent")]
    DataInconsistency,

    #[error("missing bearer token")]
    TokenMissing,

    #[error("invalid token")]
    TokenInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("session revoked")]
    SessionRevoked,

    #[error("forbidden")]
    Forbidden,

    #[error("failed to hash password")]
    HashingFailed(#[source] anyhow::Error),

    #[error("failed to sign token")]
    SigningFailed(#[source] anyhow::Error),

    #[error("failed to generate session id")]
    RandomnessFailed(#[source] anyhow::Error),

    #[error("storage failure")]
    Store(#[source] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_)
            | Self::AlreadyRegistered(_)
            | Self::NotFound
            | Self::AuthenticationFailed
            | Self::TokenMissing
            | Self::TokenInvalid
            | Self::TokenExpired
            | Self::SessionRevoked
            | Self::Forbidden => ErrorKind::Client,
            Self::DataInconsistency
            | Self::HashingFailed(_)
            | Self::SigningFailed(_)
            | Self::RandomnessFailed(_)
            | Self::Store(_) => ErrorKind::Server,
        }
    }

    pub(crate) fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
