//! Domain types for accounts, referral admission and commission requests.
//!
//! Identifiers are newtypes so a `UserId` can never be passed where a
//! `RequestId` is expected, and roles/statuses are closed enums so every
//! authorization or workflow `match` is checked exhaustively.

pub mod referral;
pub mod status;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use referral::{ReferralDenial, ReferralRule, check_admission};
pub use status::{RequestStatus, TransitionPolicy};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                debug_assert!(id >= 0, concat!(stringify!($name), " should be non-negative"));
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }
    };
}

id_newtype!(
    /// Internal identifier of a user account.
    UserId
);

id_newtype!(
    /// Internal sequential identifier of a commission request.
    ///
    /// Only owners and admins ever see this value; anonymous callers use the
    /// access key instead.
    RequestId
);

id_newtype!(
    /// Internal identifier of a referral code record.
    ReferralId
);

/// Account role. There is no hierarchy: `Admin` is the only privileged role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Who is making a call, as established by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
