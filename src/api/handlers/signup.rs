use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use super::{invalid_body, TokenResponse};
use crate::{
    api::{
        error::{ApiError, ErrorBody, Service},
        state::AuthState,
    },
    auth::token::Principal,
    provisioning::{FacilityManagerSignup, PetOwnerSignup},
};

#[utoipa::path(
    post,
    path = "/dogowner/signUp",
    request_body = PetOwnerSignup,
    responses(
        (status = 201, description = "Pet owner created", body = TokenResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Email or phone number already registered", body = ErrorBody)
    ),
    tag = "signup"
)]
pub async fn signup_pet_owner(
    state: Extension<Arc<AuthState>>,
    payload: Result<Json<PetOwnerSignup>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::new(Service::PetOwner, invalid_body(&rejection)))?;

    let provisioned = state
        .pet_owners()
        .provision(&request)
        .await
        .map_err(ApiError::from_service(Service::PetOwner))?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: provisioned.access_token,
        }),
    ))
}

// Only admins reach this handler; the new manager joins the admin's organization.
#[utoipa::path(
    post,
    path = "/dogrunmg/signUp",
    request_body = FacilityManagerSignup,
    responses(
        (status = 201, description = "Facility manager created", body = TokenResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 403, description = "Caller is not an organization admin", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "signup"
)]
pub async fn signup_facility_manager(
    state: Extension<Arc<AuthState>>,
    Extension(admin): Extension<Principal>,
    payload: Result<Json<FacilityManagerSignup>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::new(Service::FacilityManager, invalid_body(&rejection)))?;

    let provisioned = state
        .facility_managers()
        .provision(&admin, &request)
        .await
        .map_err(ApiError::from_service(Service::FacilityManager))?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: provisioned.access_token,
        }),
    ))
}
