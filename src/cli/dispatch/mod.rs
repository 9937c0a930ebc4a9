//! Map parsed CLI arguments to the action the binary runs.

use crate::{
    auth::check_jwt_secret,
    cli::{
        actions::{
            server::{Args, SigningSecret},
            Action,
        },
        commands::{auth, vault},
    },
};
use anyhow::{anyhow, Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let vault_opts = vault::Options::parse(matches)?;

    let signing_secret = match (auth_opts.jwt_secret, vault_opts) {
        (Some(secret), None) => {
            check_jwt_secret(&secret)
                .with_context(|| format!("invalid --{}", auth::ARG_JWT_SECRET))?;
            SigningSecret::Direct(secret)
        }
        (None, Some(vault)) => SigningSecret::Vault(vault),
        (Some(_), Some(_)) => {
            return Err(anyhow!(
                "--{} and --{} are mutually exclusive",
                auth::ARG_JWT_SECRET,
                vault::ARG_VAULT_URL
            ))
        }
        (None, None) => {
            return Err(anyhow!(
                "missing required argument: --{} or --{}",
                auth::ARG_JWT_SECRET,
                vault::ARG_VAULT_URL
            ))
        }
    };

    Ok(Action::Server(Args {
        port,
        dsn,
        signing_secret,
        jwt_expiry_hours: auth_opts.jwt_expiry_hours,
    }))
}
