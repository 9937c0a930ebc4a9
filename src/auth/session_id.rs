use anyhow::Context;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

use super::error::{AuthError, AuthResult};

const SESSION_ID_BYTES: usize = 32;

/// Length of every generated session id (32 random bytes, unpadded base64url).
pub const SESSION_ID_LEN: usize = 43;

/// Create a new opaque session id for an account's session slot.
///
/// No uniqueness check is made against stored sessions.
///
/// # Errors
/// Returns `RandomnessFailed` if the OS random source is unavailable.
pub fn generate_session_id() -> AuthResult<String> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to read OS randomness")
        .map_err(AuthError::RandomnessFailed)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
