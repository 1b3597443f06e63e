//! Typed identifiers for users, groups and token records.
//!
//! Each id is a UUID string stored as TEXT; the wrappers keep a user id from
//! being passed where a group or token id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wrap a stored value without checking its shape.
            pub fn from_string(value: String) -> Self {
                Self(value)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            /// Accepts only well-formed UUIDs.
            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(|_| Self(value.to_string()))
            }
        }
    };
}

identifier!(
    /// Primary key of a user
    UserId
);

identifier!(
    /// Primary key of a group
    GroupId
);

identifier!(
    /// Primary key of an issued token record
    TokenId
);
