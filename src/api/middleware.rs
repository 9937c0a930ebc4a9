//! Bearer authentication and role checks for protected routes.

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{info_span, warn, Instrument};

use super::{
    error::{ApiError, Service},
    state::AuthState,
};
use crate::auth::{authorize, token::Principal, Role};

/// Paths served without a bearer token. Matched exactly.
pub const PUBLIC_ROUTES: &[&str] = &[
    "/health",
    "/auth/dogowner/token",
    "/auth/dogrunmg/token",
    "/dogowner/signUp",
    "/org/contract",
];

#[must_use]
pub fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path)
}

/// Validate the bearer token and attach the [`Principal`] to the request.
///
/// # Errors
/// Returns the validator's rejection rendered as an auth-service error.
pub async fn authenticate(
    State(state): State<Arc<AuthState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let span = info_span!(
        "auth.authenticate",
        http.method = %request.method(),
        http.path = %request.uri().path()
    );
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let principal = state
        .validator()
        .validate_header(authorization.as_deref())
        .instrument(span)
        .await
        .map_err(ApiError::from_service(Service::Auth))?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Route layer enforcing an allow-list; runs after [`authenticate`].
///
/// # Errors
/// `Forbidden` when the caller's role is not allowed, `TokenMissing` if no principal
/// was attached.
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    principal: Option<Extension<Principal>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(Extension(principal)) = principal else {
        return Err(ApiError::new(
            Service::Auth,
            crate::auth::AuthError::TokenMissing,
        ));
    };

    if let Err(err) = authorize(principal.role, allowed) {
        warn!(
            subject_id = principal.subject_id,
            role = %principal.role,
            path = %request.uri().path(),
            "role not allowed"
        );
        return Err(ApiError::new(Service::Auth, err));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_match_exactly() {
        assert!(is_public("/auth/dogowner/token"));
        assert!(is_public("/health"));
        assert!(!is_public("/auth/dogowner/token/"));
        assert!(!is_public("/auth/dogowner/revoke"));
        assert!(!is_public("/dogrunmg/signUp"));
        assert!(!is_public("/HEALTH"));
    }
}
