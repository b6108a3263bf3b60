//! LDAP/Active Directory authentication module
//!
//! Two flows share one single-use session primitive:
//! - User authentication: bind as `username@domain`, then fetch the profile
//! - Directory listing: bind as the service account, search the whole subtree
//!
//! Raw entries are flattened into [`dirauth_core::types::IdentityRecord`]s by
//! the normalizer, which parses `memberOf` into department and organization.

mod authenticator;
mod client;
mod dn;
mod normalizer;
mod query;
mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use authenticator::UserAuthenticator;
pub use client::{DirectoryConnector, DirectorySession, LdapConnector};
pub use dn::{split_components, DnError, GroupPath};
pub use normalizer::normalize;
pub use query::{build_user_filter, DirectoryQuery, UserFilter};
pub use types::*;
