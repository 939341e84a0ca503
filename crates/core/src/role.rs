use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for access resolution.
///
/// Roles are intentionally opaque strings at this layer; mapping roles to
/// permission defaults is done by the policy data the resolvers consume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

/// Well-known role names.
///
/// The catalog of roles is open-ended (stored data may reference others),
/// but these four are the ones the platform itself assigns meaning to.
pub mod roles {
    pub const USER: &str = "user";
    pub const ADMIN: &str = "admin";
    pub const CONTROLLER: &str = "controller";
    pub const SUPER_ADMIN: &str = "super-admin";
}

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the top-level administrative role.
    ///
    /// Super-admins bypass company enablement and user-level module gating;
    /// role eligibility on a module still applies.
    pub fn is_super_admin(&self) -> bool {
        self.as_str() == roles::SUPER_ADMIN
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}
