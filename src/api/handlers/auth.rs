//! Login, revoke and session introspection.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{invalid_body, TokenResponse};
use crate::{
    api::{
        error::{ApiError, ErrorBody, Service},
        state::AuthState,
    },
    auth::{
        error::AuthResult, token::Principal, validation, AccountKind,
    },
    store::Identifier,
};

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PetOwnerLogin {
    pub password: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct FacilityManagerLogin {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub subject_id: i64,
    /// Integer role code, as carried in the token.
    pub role: i32,
    pub account_kind: AccountKind,
}

async fn login(
    state: &AuthState,
    kind: AccountKind,
    identifier: AuthResult<Identifier>,
    password: &str,
) -> Result<Json<TokenResponse>, ApiError> {
    let to_api = ApiError::from_service(Service::Auth);
    let identifier = identifier.map_err(&to_api)?;
    let password = validation::password(password).map_err(&to_api)?;

    let access_token = state
        .login()
        .login(kind, &identifier, password)
        .await
        .map_err(&to_api)?;
    Ok(Json(TokenResponse { access_token }))
}

#[utoipa::path(
    post,
    path = "/auth/dogowner/token",
    request_body = PetOwnerLogin,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 400, description = "Missing or ambiguous identifier", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login_pet_owner(
    state: Extension<Arc<AuthState>>,
    payload: Result<Json<PetOwnerLogin>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::new(Service::Auth, invalid_body(&rejection)))?;
    let identifier =
        validation::email_xor_phone(request.email.as_deref(), request.phone_number.as_deref());
    login(&state, AccountKind::PetOwner, identifier, &request.password).await
}

#[utoipa::path(
    post,
    path = "/auth/dogrunmg/token",
    request_body = FacilityManagerLogin,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 400, description = "Missing email", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login_facility_manager(
    state: Extension<Arc<AuthState>>,
    payload: Result<Json<FacilityManagerLogin>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::new(Service::Auth, invalid_body(&rejection)))?;
    let identifier = validation::email(&request.email).map(Identifier::Email);
    login(
        &state,
        AccountKind::FacilityManager,
        identifier,
        &request.password,
    )
    .await
}

async fn revoke(state: &AuthState, principal: &Principal) -> Result<StatusCode, ApiError> {
    state
        .revoke()
        .revoke(principal)
        .await
        .map_err(ApiError::from_service(Service::Auth))?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/auth/dogowner/revoke",
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Missing, invalid or revoked token", body = ErrorBody),
        (status = 403, description = "Not a pet owner", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn revoke_pet_owner(
    state: Extension<Arc<AuthState>>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, ApiError> {
    revoke(&state, &principal).await
}

#[utoipa::path(
    post,
    path = "/auth/dogrunmg/revoke",
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Missing, invalid or revoked token", body = ErrorBody),
        (status = 403, description = "Not a facility manager", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn revoke_facility_manager(
    state: Extension<Arc<AuthState>>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, ApiError> {
    revoke(&state, &principal).await
}

#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Token is active", body = SessionResponse),
        (status = 401, description = "Missing, invalid or revoked token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn session(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(SessionResponse {
        subject_id: principal.subject_id,
        role: principal.role.code(),
        account_kind: principal.account_kind,
    })
}
