//! Groups bundle permissions and act as the role of their members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::id::GroupId;
use super::permission::Permission;

/// Prefix applied to a group name to form its role authority.
pub const ROLE_PREFIX: &str = "ROLE_";

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub permissions: BTreeSet<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Authorities granted to members of this group.
    pub fn authorities(&self) -> BTreeSet<String> {
        derive_authorities(self)
    }
}

/// Authorities are every permission identifier plus `ROLE_<group name>`.
pub fn derive_authorities(group: &Group) -> BTreeSet<String> {
    let mut authorities: BTreeSet<String> =
        group.permissions.iter().map(|permission| permission.as_str().to_string()).collect();
    authorities.insert(format!("{ROLE_PREFIX}{}", group.name));
    authorities
}
