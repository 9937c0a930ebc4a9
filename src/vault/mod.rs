//! HashiCorp Vault client used to source the token signing secret.

pub mod kv;

use crate::{cli::globals::GlobalArgs, APP_USER_AGENT};
use anyhow::{anyhow, Result};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

/// Build a Vault API URL on the same scheme/host/port as the login URL.
///
/// # Errors
/// Returns an error if the login URL has no host or an unsupported scheme.
#[instrument(skip(globals))]
pub fn endpoint_url(globals: &GlobalArgs, endpoint: &str) -> Result<String> {
    let url = Url::parse(&globals.vault_url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        },
    };

    let endpoint_url = format!("{scheme}://{host}:{port}{endpoint}");

    debug!("endpoint URL: {}", endpoint_url);

    Ok(endpoint_url)
}

pub(crate) fn client() -> Result<Client> {
    Ok(Client::builder().user_agent(APP_USER_AGENT).build()?)
}

/// Turn a non-2xx Vault reply into an error carrying its first message.
pub(crate) async fn ensure_success(url: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let json_response: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        return Err(anyhow!(
            "{} - {}, {}",
            url,
            status,
            json_response["errors"][0].as_str().unwrap_or("")
        ));
    }

    Ok(json_response)
}

/// Unwrap a response-wrapped AppRole secret id.
/// Create wrapped token with:
/// vault write -wrap-ttl=300s -f auth/approle/role/pawpass/secret-id
///
/// # Errors
/// Returns an error if Vault rejects the token or the reply has no secret id.
#[instrument(skip(globals, token))]
pub async fn unwrap(globals: &GlobalArgs, token: &str) -> Result<String> {
    let unwrap_url = endpoint_url(globals, "/v1/sys/wrapping/unwrap")?;

    let response = client()?
        .post(&unwrap_url)
        .header("X-Vault-Token", token)
        .send()
        .await?;

    let json_response = ensure_success(&unwrap_url, response).await?;
    let sid = json_response["data"]["secret_id"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no secret_id found"))?;

    Ok(sid.to_string())
}

/// Login to Vault using AppRole and return the client token.
///
/// # Errors
/// Returns an error if the login is rejected or the reply has no client token.
#[instrument(skip(globals, sid))]
pub async fn approle_login(globals: &GlobalArgs, sid: &str, rid: &str) -> Result<String> {
    let login_payload = json!({
        "role_id": rid,
        "secret_id": sid
    });

    debug!("login URL: {}, role ID: {}", globals.vault_url, rid);

    let response = client()?
        .post(&globals.vault_url)
        .json(&login_payload)
        .send()
        .await?;

    let json_response = ensure_success(&globals.vault_url, response).await?;
    let token = json_response["auth"]["client_token"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no client_token found"))?;

    Ok(token.to_string())
}
