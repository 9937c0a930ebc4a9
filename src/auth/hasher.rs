//! Password hashing with bcrypt.
//!
//! bcrypt is CPU bound, so both operations run on the blocking pool.

use anyhow::Context;
use tokio::task;

use super::error::{AuthError, AuthResult};

#[derive(Clone, Copy, Debug)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl CredentialHasher {
    /// Hasher with a custom work factor (tests use the bcrypt minimum of 4).
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password into a salted bcrypt string.
    ///
    /// # Errors
    /// Returns `HashingFailed` if bcrypt rejects the input or the blocking task dies.
    pub async fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let plaintext = plaintext.to_owned();
        let cost = self.cost;
        task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .context("password hashing task failed")
            .map_err(AuthError::HashingFailed)?
            .context("failed to hash password")
            .map_err(AuthError::HashingFailed)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// # Errors
    /// Returns `AuthenticationFailed` on mismatch and `HashingFailed` when the stored
    /// hash is unreadable.
    pub async fn verify(&self, hash: &str, plaintext: &str) -> AuthResult<()> {
        let hash = hash.to_owned();
        let plaintext = plaintext.to_owned();
        let matches = task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
            .await
            .context("password verification task failed")
            .map_err(AuthError::HashingFailed)?
            .context("stored password hash is malformed")
            .map_err(AuthError::HashingFailed)?;

        if matches {
            Ok(())
        } else {
            Err(AuthError::AuthenticationFailed)
        }
    }
}
