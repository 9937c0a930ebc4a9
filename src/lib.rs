//! # Pawpass (account authentication and session authority)
//!
//! `pawpass` authenticates the three account kinds of the platform (pet owners,
//! facility managers and facility-manager admins), issues HS256 bearer tokens and
//! gates every protected route with a role allow-list.
//!
//! ## Single active session
//!
//! Every account has exactly one session slot: a nullable `session_id` column on its
//! auth record. A login overwrites the slot, a revoke clears it, and a bearer token is
//! only accepted while its `sid` claim matches the stored value. Logging in again
//! therefore silently invalidates every previously issued token for that account.
//!
//! ## Provisioning
//!
//! Signup creates the whole account aggregate (identity, auth record, credential and,
//! for organization contracts, the organization itself) inside one database
//! transaction. A failure at any step leaves no rows behind.

pub mod api;
pub mod auth;
pub mod cli;
pub mod provisioning;
pub mod store;
pub mod vault;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
