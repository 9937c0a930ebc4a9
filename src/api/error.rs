//! HTTP rendering of [`AuthError`].
//!
//! Body: `{code, message, trace?}` with `code = "<service>-<kind>"`. `trace` carries
//! the cause chain and is only present for server errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::error::Error as _;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::error::{AuthError, ErrorKind};

/// Area of the API that detected a failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Service {
    Other,
    Auth,
    PetOwner,
    Organization,
    FacilityManager,
}

impl Service {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Other => 0,
            Self::Auth => 1,
            Self::PetOwner => 3,
            Self::Organization => 6,
            Self::FacilityManager => 7,
        }
    }
}

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    service: Service,
    error: AuthError,
}

impl ApiError {
    #[must_use]
    pub fn new(service: Service, error: AuthError) -> Self {
        Self { service, error }
    }

    /// Adapter for `map_err`.
    pub fn from_service(service: Service) -> impl Fn(AuthError) -> Self {
        move |error| Self::new(service, error)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.error {
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::AlreadyRegistered(_) => StatusCode::CONFLICT,
            AuthError::NotFound
            | AuthError::AuthenticationFailed
            | AuthError::TokenMissing
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::SessionRevoked => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::DataInconsistency
            | AuthError::HashingFailed(_)
            | AuthError::SigningFailed(_)
            | AuthError::RandomnessFailed(_)
            | AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let kind = self.error.kind();
        ErrorBody {
            code: format!("{}-{}", self.service.code(), kind.code()),
            message: self.error.to_string(),
            trace: match kind {
                ErrorKind::Server => cause_chain(&self.error),
                ErrorKind::Client => None,
            },
        }
    }
}

fn cause_chain(error: &AuthError) -> Option<String> {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    if causes.is_empty() {
        None
    } else {
        Some(causes.join(": "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        match self.error.kind() {
            ErrorKind::Server => error!(
                code = %body.code,
                error = %self.error,
                trace = body.trace.as_deref().unwrap_or(""),
                "request failed"
            ),
            ErrorKind::Client => info!(code = %body.code, error = %self.error, "request rejected"),
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn client_error_has_no_trace() {
        let err = ApiError::new(Service::Auth, AuthError::SessionRevoked);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            err.body(),
            ErrorBody {
                code: "1-1".to_string(),
                message: "session revoked".to_string(),
                trace: None,
            }
        );
    }

    #[test]
    fn server_error_carries_cause_chain() {
        let cause = anyhow!("connection reset").context("failed to insert credential");
        let err = ApiError::new(Service::Organization, AuthError::Store(cause));

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body.code, "6-2");
        assert_eq!(body.message, "storage failure");
        assert_eq!(
            body.trace.as_deref(),
            Some("failed to insert credential: connection reset")
        );
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (AuthError::InvalidInput("x".to_string()), StatusCode::BAD_REQUEST),
            (AuthError::AlreadyRegistered("email"), StatusCode::CONFLICT),
            (AuthError::NotFound, StatusCode::UNAUTHORIZED),
            (AuthError::AuthenticationFailed, StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthError::Forbidden, StatusCode::FORBIDDEN),
            (AuthError::DataInconsistency, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::new(Service::PetOwner, error).status(), status);
        }
    }

    #[test]
    fn service_codes() {
        assert_eq!(Service::Other.code(), 0);
        assert_eq!(Service::PetOwner.code(), 3);
        assert_eq!(Service::FacilityManager.code(), 7);
    }
}
