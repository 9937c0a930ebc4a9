use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_EXPIRY_HOURS: &str = "jwt-expiry-hours";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 signing secret for access tokens")
                .env("PAWPASS_JWT_SECRET")
                .hide_env_values(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .conflicts_with(super::vault::ARG_VAULT_URL)
                .required_unless_present(super::vault::ARG_VAULT_URL),
        )
        .arg(
            Arg::new(ARG_JWT_EXPIRY_HOURS)
                .long(ARG_JWT_EXPIRY_HOURS)
                .help("Access token lifetime in hours")
                .env("PAWPASS_JWT_EXPIRY_HOURS")
                .default_value("24")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: Option<SecretString>,
    pub jwt_expiry_hours: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if the token lifetime is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            jwt_secret: matches
                .get_one::<String>(ARG_JWT_SECRET)
                .map(|secret| SecretString::from(secret.clone())),
            jwt_expiry_hours: matches
                .get_one::<u64>(ARG_JWT_EXPIRY_HOURS)
                .copied()
                .context("missing required argument: --jwt-expiry-hours")?,
        })
    }
}
