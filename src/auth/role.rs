//! Roles carried in bearer tokens and the account kinds that back them.
//!
//! A role is the coarse capability class checked by the authorization guard. An
//! account kind selects which identity tables hold the account. Admin and regular
//! facility managers share an account kind but differ in role.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Integer role codes as they appear in the `role` claim.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    /// Trusted internal caller, pre-authorized upstream.
    System,
    FacilityManager,
    FacilityManagerAdmin,
    PetOwner,
    General,
}

impl Role {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::System => 0,
            Self::FacilityManager => 1,
            Self::FacilityManagerAdmin => 2,
            Self::PetOwner => 3,
            Self::General => 100,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::System),
            1 => Some(Self::FacilityManager),
            2 => Some(Self::FacilityManagerAdmin),
            3 => Some(Self::PetOwner),
            100 => Some(Self::General),
            _ => None,
        }
    }

    /// Account kind whose session slot backs this role, if any.
    #[must_use]
    pub const fn account_kind(self) -> Option<AccountKind> {
        match self {
            Self::PetOwner => Some(AccountKind::PetOwner),
            Self::FacilityManager | Self::FacilityManagerAdmin => {
                Some(AccountKind::FacilityManager)
            }
            Self::System | Self::General => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::FacilityManager => "facility_manager",
            Self::FacilityManagerAdmin => "facility_manager_admin",
            Self::PetOwner => "pet_owner",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which identity tables an account lives in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    PetOwner,
    FacilityManager,
}

impl AccountKind {
    /// Role granted to an account of this kind.
    #[must_use]
    pub const fn role(self, is_admin: bool) -> Role {
        match self {
            Self::PetOwner => Role::PetOwner,
            Self::FacilityManager if is_admin => Role::FacilityManagerAdmin,
            Self::FacilityManager => Role::FacilityManager,
        }
    }

    /// Path segment used by the HTTP routes (`/auth/{segment}/token`).
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::PetOwner => "dogowner",
            Self::FacilityManager => "dogrunmg",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PetOwner => "pet_owner",
            Self::FacilityManager => "facility_manager",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any authenticated role.
pub const ALL: &[Role] = &[
    Role::System,
    Role::PetOwner,
    Role::FacilityManagerAdmin,
    Role::FacilityManager,
    Role::General,
];

/// System callers only; the guard lets [`Role::System`] through unconditionally.
pub const SYSTEM: &[Role] = &[];

/// Facility lookups.
pub const FACILITY_REFER: &[Role] = &[
    Role::PetOwner,
    Role::General,
    Role::FacilityManagerAdmin,
    Role::FacilityManager,
];

/// Facility search.
pub const FACILITY_SEARCH: &[Role] = &[Role::PetOwner, Role::General];

/// Pet management, including the pet owner's own session.
pub const PET_MANAGE: &[Role] = &[Role::PetOwner];

/// Facility management, including the manager's own session.
pub const FACILITY_MANAGE: &[Role] = &[Role::FacilityManagerAdmin, Role::FacilityManager];

/// Organization-level administration.
pub const FACILITY_SUPER_MANAGE: &[Role] = &[Role::FacilityManagerAdmin];
