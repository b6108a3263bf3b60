//! Configuration for Dirauth

use crate::types::Credential;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay `DIRAUTH_*` variables resolved through `lookup` onto this config.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("DIRAUTH_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(port) = lookup("DIRAUTH_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        let dir = &mut self.directory;
        if let Some(host) = lookup("DIRAUTH_LDAP_HOST") {
            dir.host = host;
        }
        if let Some(port) = lookup("DIRAUTH_LDAP_PORT").and_then(|p| p.parse().ok()) {
            dir.port = port;
        }
        if let Some(domain) = lookup("DIRAUTH_LDAP_DOMAIN") {
            dir.domain = domain;
        }
        if let Some(base_dn) = lookup("DIRAUTH_LDAP_BASE_DN") {
            dir.base_dn = base_dn;
        }
        if let Some(filter) = lookup("DIRAUTH_LDAP_USER_FILTER") {
            dir.user_filter = filter;
        }
        if let Some(timeout) = lookup("DIRAUTH_LDAP_TIMEOUT").and_then(|t| t.parse().ok()) {
            dir.timeout_seconds = timeout;
        }
        if let Some(principal) = lookup("DIRAUTH_SERVICE_PRINCIPAL") {
            dir.service_principal = principal;
        }
        if let Some(password) = lookup("DIRAUTH_SERVICE_PASSWORD") {
            dir.service_password = password;
        }
        if let Some(path) = lookup("DIRAUTH_SERVICE_PASSWORD_FILE") {
            dir.service_password_file = Some(PathBuf::from(path));
        }
        if let Some(mode) = lookup("DIRAUTH_PROFILE_LOOKUP") {
            match mode.as_str() {
                "bound_user" => dir.profile_lookup = ProfileLookup::BoundUser,
                "service_account" => dir.profile_lookup = ProfileLookup::ServiceAccount,
                other => tracing::warn!(value = %other, "Ignoring unknown DIRAUTH_PROFILE_LOOKUP"),
            }
        }

        if let Some(level) = lookup("DIRAUTH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("DIRAUTH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.directory.validate()?;

        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(crate::Error::Config(format!(
                "Unknown log format: {} (expected pretty or json)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: crate::DEFAULT_HTTP_PORT,
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Which identity performs the profile search after a successful user bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileLookup {
    /// Open a second session bound as the service account
    #[default]
    ServiceAccount,
    /// Search on the session already bound as the user
    BoundUser,
}

/// Directory (LDAP / Active Directory) settings
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory server host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Directory server port
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Domain appended to usernames for user binds (`user@domain`)
    #[serde(default)]
    pub domain: String,

    /// Root of every user search
    /// Example: "OU=Staff,DC=example,DC=net"
    #[serde(default)]
    pub base_dn: String,

    /// User search filter
    /// Use {username} as placeholder
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Connect timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Bind principal of the read-only service account
    #[serde(default)]
    pub service_principal: String,

    /// Service account password
    /// For production: use service_password_file
    #[serde(default, skip_serializing)]
    pub service_password: String,

    /// Path to a file containing the service account password
    #[serde(default)]
    pub service_password_file: Option<PathBuf>,

    #[serde(default)]
    pub profile_lookup: ProfileLookup,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_ldap_port() -> u16 {
    crate::DEFAULT_LDAP_PORT
}

fn default_user_filter() -> String {
    "(sAMAccountName={username})".to_string()
}

fn default_timeout() -> u64 {
    crate::DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_ldap_port(),
            domain: String::new(),
            base_dn: String::new(),
            user_filter: default_user_filter(),
            timeout_seconds: default_timeout(),
            service_principal: String::new(),
            service_password: String::new(),
            service_password_file: None,
            profile_lookup: ProfileLookup::default(),
        }
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("domain", &self.domain)
            .field("base_dn", &self.base_dn)
            .field("user_filter", &self.user_filter)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("service_principal", &self.service_principal)
            .field("service_password", &"<redacted>")
            .field("service_password_file", &self.service_password_file)
            .field("profile_lookup", &self.profile_lookup)
            .finish()
    }
}

impl DirectoryConfig {
    /// LDAP URL of the directory server
    pub fn url(&self) -> String {
        format!("ldap://{}:{}", self.host, self.port)
    }

    /// Bind principal for an end user
    pub fn user_principal(&self, username: &str) -> String {
        format!("{}@{}", username, self.domain)
    }

    /// Connect timeout
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }

    /// Resolve the service account credential from the configured source
    pub fn service_credential(&self) -> crate::Result<Credential> {
        if self.service_principal.is_empty() {
            return Err(crate::Error::Config(
                "Service principal is required".into(),
            ));
        }

        if !self.service_password.is_empty() {
            return Ok(Credential::new(
                self.service_principal.clone(),
                self.service_password.clone(),
            ));
        }

        if let Some(ref path) = self.service_password_file {
            let content = std::fs::read_to_string(path).map_err(|e| {
                crate::Error::Config(format!(
                    "Failed to read service password file {:?}: {}",
                    path, e
                ))
            })?;
            let password = content.trim_end_matches(['\r', '\n']);
            if password.is_empty() {
                return Err(crate::Error::Config(format!(
                    "Service password file {:?} is empty",
                    path
                )));
            }
            return Ok(Credential::new(
                self.service_principal.clone(),
                password.to_string(),
            ));
        }

        Err(crate::Error::Config(
            "No service password source configured".into(),
        ))
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::Error::Config("Directory host is required".into()));
        }

        if self.domain.is_empty() {
            return Err(crate::Error::Config("Directory domain is required".into()));
        }

        if self.base_dn.is_empty() {
            return Err(crate::Error::Config("Base DN is required".into()));
        }

        if !self.user_filter.contains("{username}") {
            return Err(crate::Error::Config(
                "User filter must contain {username} placeholder".into(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::Config(
                "Connect timeout must be at least one second".into(),
            ));
        }

        if self.service_principal.is_empty() {
            return Err(crate::Error::Config(
                "Service principal is required".into(),
            ));
        }

        if self.service_password.is_empty() && self.service_password_file.is_none() {
            return Err(crate::Error::Config(
                "No service password source configured".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
