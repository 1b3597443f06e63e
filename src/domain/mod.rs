//! Domain layer
//!
//! Pure domain types with no infrastructure dependencies beyond the ID
//! encoding used by storage.
//!
//! - `id`: Type-safe identifiers with the NewType pattern
//! - `permission`: The closed permission catalog
//! - `group`: Groups and the authorities they grant
//! - `page`: Paging parameters and result pages

pub mod group;
pub mod id;
pub mod page;
pub mod permission;

pub use group::{derive_authorities, Group, ROLE_PREFIX};
pub use id::{GroupId, TokenId, UserId};
pub use page::{Page, PageDefaults, PageRequest, ResolvedPage, SortOrder};
pub use permission::{Permission, PermissionParseError};
