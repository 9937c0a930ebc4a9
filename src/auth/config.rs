use secrecy::{ExposeSecret, SecretString};

const DEFAULT_JWT_EXPIRY_HOURS: u64 = 24;

/// Shortest HS256 signing secret the server will start with.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Reject signing secrets shorter than [`MIN_JWT_SECRET_LEN`] bytes.
///
/// # Errors
/// Returns an error naming the minimum length when the secret is too short.
pub fn check_jwt_secret(secret: &SecretString) -> anyhow::Result<()> {
    anyhow::ensure!(
        secret.expose_secret().len() >= MIN_JWT_SECRET_LEN,
        "JWT secret must be at least {MIN_JWT_SECRET_LEN} characters long"
    );
    Ok(())
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    jwt_expiry_hours: u64,
    hash_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            jwt_expiry_hours: DEFAULT_JWT_EXPIRY_HOURS,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    #[must_use]
    pub fn with_jwt_expiry_hours(mut self, hours: u64) -> Self {
        self.jwt_expiry_hours = hours;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    #[must_use]
    pub fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }

    #[must_use]
    pub fn jwt_expiry_hours(&self) -> u64 {
        self.jwt_expiry_hours
    }

    #[must_use]
    pub fn hash_cost(&self) -> u32 {
        self.hash_cost
    }
}
