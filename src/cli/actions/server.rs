use crate::{
    api,
    auth::{check_jwt_secret, AuthConfig},
    cli::{commands::vault::Options as VaultOptions, globals::GlobalArgs},
    vault,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// Where the token signing secret comes from.
#[derive(Debug)]
pub enum SigningSecret {
    Direct(SecretString),
    Vault(VaultOptions),
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub signing_secret: SigningSecret,
    pub jwt_expiry_hours: u64,
}

/// Resolve the signing secret and run the HTTP server.
///
/// # Errors
/// Returns an error if the secret cannot be resolved or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    let secret = match args.signing_secret {
        SigningSecret::Direct(secret) => secret,
        SigningSecret::Vault(options) => secret_from_vault(&options)
            .await
            .context("Failed to read signing secret from Vault")?,
    };
    check_jwt_secret(&secret)?;

    let config = AuthConfig::new(secret).with_jwt_expiry_hours(args.jwt_expiry_hours);

    api::new(args.port, args.dsn, config).await
}

async fn secret_from_vault(options: &VaultOptions) -> Result<SecretString> {
    let mut globals = GlobalArgs::new(options.url.clone());

    let secret_id = match (&options.wrapped_token, &options.secret_id) {
        (Some(wrapped), _) => vault::unwrap(&globals, wrapped.expose_secret()).await?,
        (None, Some(secret_id)) => secret_id.expose_secret().to_string(),
        (None, None) => anyhow::bail!("missing Vault secret id"),
    };

    let token = vault::approle_login(&globals, &secret_id, &options.role_id).await?;
    globals.set_token(SecretString::from(token));

    info!("Logged in to Vault, reading {}/{}", options.kv_mount, options.kv_path);

    vault::kv::read_secret(&globals, &options.kv_mount, &options.kv_path).await
}
