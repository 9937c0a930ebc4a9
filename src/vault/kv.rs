use super::{client, endpoint_url, ensure_success};
use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

/// Field of the KV entry holding the signing secret.
pub const SECRET_FIELD: &str = "secret";

/// Read the signing secret from a KV v2 entry.
///
/// # Errors
/// Returns an error if the read is rejected or the field is missing or empty.
#[instrument(skip(globals))]
pub async fn read_secret(globals: &GlobalArgs, mount: &str, path: &str) -> Result<SecretString> {
    let mount = mount.trim_matches('/');
    let path = path.trim_matches('/');
    let url = endpoint_url(globals, &format!("/v1/{mount}/data/{path}"))?;

    let response = client()?
        .get(&url)
        .header("X-Vault-Token", globals.vault_token.expose_secret())
        .send()
        .await?;

    let json_response = ensure_success(&url, response).await?;
    let secret = json_response["data"]["data"][SECRET_FIELD]
        .as_str()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| anyhow!("Vault entry {mount}/{path} has no `{SECRET_FIELD}` field"))?;

    Ok(SecretString::from(secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::tests::fake_vault;

    #[tokio::test]
    async fn reads_the_secret_field() -> Result<()> {
        let mut globals = GlobalArgs::new(fake_vault().await?);
        globals.set_token(SecretString::from("hvs.client".to_string()));

        let secret = read_secret(&globals, "/secret/", "pawpass/jwt").await?;
        assert_eq!(secret.expose_secret(), "from-vault");
        Ok(())
    }

    #[tokio::test]
    async fn forbidden_read_is_an_error() -> Result<()> {
        let mut globals = GlobalArgs::new(fake_vault().await?);
        globals.set_token(SecretString::from("hvs.other".to_string()));

        assert!(read_secret(&globals, "secret", "pawpass/jwt").await.is_err());
        Ok(())
    }
}
