pub mod auth;
pub mod health;
pub mod org;
pub mod signup;

use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthError;

/// Bearer token handed out by login and signup.
#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

/// Unreadable JSON bodies are ordinary invalid input.
pub(crate) fn invalid_body(rejection: &JsonRejection) -> AuthError {
    AuthError::InvalidInput(rejection.body_text())
}
