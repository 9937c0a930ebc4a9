//! Credentials, bearer tokens, session slots and role checks.

pub mod config;
pub mod error;
pub mod guard;
pub mod hasher;
pub mod login;
pub mod revoke;
pub mod role;
pub mod session_id;
pub mod token;
pub(crate) mod validation;

pub use config::{check_jwt_secret, AuthConfig, MIN_JWT_SECRET_LEN};
pub use error::{AuthError, AuthResult, ErrorKind};
pub use guard::authorize;
pub use hasher::CredentialHasher;
pub use login::LoginService;
pub use revoke::RevokeService;
pub use role::{AccountKind, Role};
pub use token::{Claims, Principal, TokenIssuer, TokenValidator};
