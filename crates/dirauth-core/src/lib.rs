//! Dirauth Core Library
//!
//! Configuration, error taxonomy and identity types shared by the
//! directory authentication gateway.

pub mod config;
pub mod error;
pub mod types;

pub use config::GatewayConfig;
pub use error::{Error, Result};

/// Dirauth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port of the gateway
pub const DEFAULT_HTTP_PORT: u16 = 8389;

/// Default LDAP port
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default directory connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 2;

/// Attributes requested from the directory for every user search
pub const USER_ATTRIBUTES: [&str; 4] = ["name", "sAMAccountName", "mail", "memberOf"];
