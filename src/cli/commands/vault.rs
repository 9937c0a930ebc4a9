use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_VAULT_URL: &str = "vault-url";
pub const ARG_VAULT_ROLE_ID: &str = "vault-role-id";
pub const ARG_VAULT_SECRET_ID: &str = "vault-secret-id";
pub const ARG_VAULT_WRAPPED_TOKEN: &str = "vault-wrapped-token";
pub const ARG_VAULT_KV_MOUNT: &str = "vault-kv-mount";
pub const ARG_VAULT_KV_PATH: &str = "vault-kv-path";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VAULT_URL)
                .long(ARG_VAULT_URL)
                .help("Vault approle login URL, example: https://vault.tld:8200/v1/auth/<approle>/login")
                .env("PAWPASS_VAULT_URL"),
        )
        .arg(
            Arg::new(ARG_VAULT_ROLE_ID)
                .long(ARG_VAULT_ROLE_ID)
                .help("Vault role id")
                .env("PAWPASS_VAULT_ROLE_ID")
                .requires(ARG_VAULT_URL),
        )
        .arg(
            Arg::new(ARG_VAULT_SECRET_ID)
                .long(ARG_VAULT_SECRET_ID)
                .help("Vault secret id")
                .env("PAWPASS_VAULT_SECRET_ID")
                .hide_env_values(true)
                .conflicts_with(ARG_VAULT_WRAPPED_TOKEN),
        )
        .arg(
            Arg::new(ARG_VAULT_WRAPPED_TOKEN)
                .long(ARG_VAULT_WRAPPED_TOKEN)
                .help("Vault wrapped token")
                .env("PAWPASS_VAULT_WRAPPED_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_MOUNT)
                .long(ARG_VAULT_KV_MOUNT)
                .help("Vault KV-v2 mount holding the signing secret")
                .env("PAWPASS_VAULT_KV_MOUNT")
                .default_value("secret"),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_PATH)
                .long(ARG_VAULT_KV_PATH)
                .help("Vault KV-v2 path of the signing secret (field `secret`)")
                .env("PAWPASS_VAULT_KV_PATH")
                .default_value("pawpass/jwt"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub role_id: String,
    pub secret_id: Option<SecretString>,
    pub wrapped_token: Option<SecretString>,
    pub kv_mount: String,
    pub kv_path: String,
}

impl Options {
    /// Vault options, or `None` when no Vault URL was given.
    ///
    /// # Errors
    /// Returns an error if the URL is set but the AppRole credentials are incomplete.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Option<Self>> {
        let Some(url) = matches.get_one::<String>(ARG_VAULT_URL).cloned() else {
            return Ok(None);
        };

        let role_id = matches
            .get_one::<String>(ARG_VAULT_ROLE_ID)
            .cloned()
            .with_context(|| format!("missing required argument: --{ARG_VAULT_ROLE_ID}"))?;

        let secret = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|value| SecretString::from(value.clone()))
        };
        let secret_id = secret(ARG_VAULT_SECRET_ID);
        let wrapped_token = secret(ARG_VAULT_WRAPPED_TOKEN);
        if secret_id.is_none() && wrapped_token.is_none() {
            anyhow::bail!(
                "missing required argument: --{ARG_VAULT_SECRET_ID} or --{ARG_VAULT_WRAPPED_TOKEN}"
            );
        }

        Ok(Some(Self {
            url,
            role_id,
            secret_id,
            wrapped_token,
            kv_mount: matches
                .get_one::<String>(ARG_VAULT_KV_MOUNT)
                .cloned()
                .unwrap_or_else(|| "secret".to_string()),
            kv_path: matches
                .get_one::<String>(ARG_VAULT_KV_PATH)
                .cloned()
                .unwrap_or_else(|| "pawpass/jwt".to_string()),
        }))
    }
}
