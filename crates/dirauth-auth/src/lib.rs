//! Directory authentication for Dirauth

pub mod ldap;

pub use ldap::{
    DirectoryConnector, DirectoryEntry, DirectoryQuery, DirectorySession, GroupPath,
    LdapConnector, UserAuthenticator, UserFilter,
};
