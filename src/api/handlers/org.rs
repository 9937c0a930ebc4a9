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
    provisioning::OrganizationContract,
};

#[utoipa::path(
    post,
    path = "/org/contract",
    request_body = OrganizationContract,
    responses(
        (status = 201, description = "Organization and admin manager created", body = TokenResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Contact email already registered", body = ErrorBody)
    ),
    tag = "signup"
)]
pub async fn contract(
    state: Extension<Arc<AuthState>>,
    payload: Result<Json<OrganizationContract>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::new(Service::Organization, invalid_body(&rejection)))?;

    let provisioned = state
        .organizations()
        .provision(&request)
        .await
        .map_err(ApiError::from_service(Service::Organization))?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: provisioned.access_token,
        }),
    ))
}
