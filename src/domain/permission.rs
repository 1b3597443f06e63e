//! Permission catalog.
//!
//! The catalog is closed: every permission a group may hold is listed here and
//! anything else is rejected with [`PermissionParseError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AuthgateError;

/// Fine-grained permissions grouped by the audience they manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Permission {
    AdminRead,
    AdminUpdate,
    AdminCreate,
    AdminDelete,
    ManagerRead,
    ManagerUpdate,
    ManagerCreate,
    ManagerDelete,
    RepresentativeRead,
    RepresentativeUpdate,
    RepresentativeCreate,
    RepresentativeDelete,
}

/// Raised when a permission identifier is not part of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid Permission: {0}")]
pub struct PermissionParseError(pub String);

impl From<PermissionParseError> for AuthgateError {
    fn from(err: PermissionParseError) -> Self {
        AuthgateError::permission_parsing(err.0)
    }
}

impl Permission {
    /// Every permission in catalog order.
    pub fn all() -> &'static [Permission] {
        &[
            Permission::AdminRead,
            Permission::AdminUpdate,
            Permission::AdminCreate,
            Permission::AdminDelete,
            Permission::ManagerRead,
            Permission::ManagerUpdate,
            Permission::ManagerCreate,
            Permission::ManagerDelete,
            Permission::RepresentativeRead,
            Permission::RepresentativeUpdate,
            Permission::RepresentativeCreate,
            Permission::RepresentativeDelete,
        ]
    }

    /// The authority string granted to holders of this permission.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AdminRead => "admin:read",
            Permission::AdminUpdate => "admin:update",
            Permission::AdminCreate => "admin:create",
            Permission::AdminDelete => "admin:delete",
            Permission::ManagerRead => "management:read",
            Permission::ManagerUpdate => "management:update",
            Permission::ManagerCreate => "management:create",
            Permission::ManagerDelete => "management:delete",
            Permission::RepresentativeRead => "representative:read",
            Permission::RepresentativeUpdate => "representative:update",
            Permission::RepresentativeCreate => "representative:create",
            Permission::RepresentativeDelete => "representative:delete",
        }
    }

    /// Upper-snake name, also accepted when parsing.
    pub fn name(&self) -> &'static str {
        match self {
            Permission::AdminRead => "ADMIN_READ",
            Permission::AdminUpdate => "ADMIN_UPDATE",
            Permission::AdminCreate => "ADMIN_CREATE",
            Permission::AdminDelete => "ADMIN_DELETE",
            Permission::ManagerRead => "MANAGER_READ",
            Permission::ManagerUpdate => "MANAGER_UPDATE",
            Permission::ManagerCreate => "MANAGER_CREATE",
            Permission::ManagerDelete => "MANAGER_DELETE",
            Permission::RepresentativeRead => "REPRESENTATIVE_READ",
            Permission::RepresentativeUpdate => "REPRESENTATIVE_UPDATE",
            Permission::RepresentativeCreate => "REPRESENTATIVE_CREATE",
            Permission::RepresentativeDelete => "REPRESENTATIVE_DELETE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Permission::AdminRead => "Can read informations about admins",
            Permission::AdminUpdate => "Can update informations about admins",
            Permission::AdminCreate => "Can create admins",
            Permission::AdminDelete => "Can delete admins",
            Permission::ManagerRead => "Can read informations about managers",
            Permission::ManagerUpdate => "Can update informations about managers",
            Permission::ManagerCreate => "Can create managers",
            Permission::ManagerDelete => "Can delete managers",
            Permission::RepresentativeRead => "Can read informations about representatives",
            Permission::RepresentativeUpdate => "Can update informations about representatives",
            Permission::RepresentativeCreate => "Can create representatives",
            Permission::RepresentativeDelete => "Can delete representatives",
        }
    }

    /// Parse a list of identifiers, failing on the first unknown entry.
    pub fn parse_all<I, S>(values: I) -> Result<Vec<Permission>, PermissionParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values.into_iter().map(|value| value.as_ref().parse()).collect()
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == s || permission.name() == s)
            .ok_or_else(|| PermissionParseError(s.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for &'static str {
    fn from(permission: Permission) -> Self {
        permission.as_str()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
