//! LDAP Client implementation
//!
//! A session is one connection carrying at most one bind and one search.
//! [`DirectoryConnector`] is the seam between the flows and the transport;
//! [`LdapConnector`] is the real implementation on top of `ldap3`.

use crate::ldap::types::*;
use async_trait::async_trait;
use dirauth_core::config::DirectoryConfig;
use dirauth_core::{Error, Result};
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use std::time::Duration;
use tracing::{debug, warn};

/// Opens single-use directory sessions
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connect to the directory server. Failures are never retried.
    async fn open(&self) -> Result<Box<dyn DirectorySession>>;
}

/// One connection to the directory server
#[async_trait]
pub trait DirectorySession: Send {
    /// Simple bind. A rejected bind is [`Error::InvalidCredentials`].
    async fn bind(&mut self, principal: &str, secret: &str) -> Result<()>;

    /// Subtree search. Zero entries is not an error.
    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>>;

    /// Release the connection. Safe to call more than once.
    async fn close(&mut self);
}

/// Connector for a real LDAP server
pub struct LdapConnector {
    url: String,
    timeout: Duration,
}

impl LdapConnector {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            url: config.url(),
            timeout: config.timeout(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn open(&self) -> Result<Box<dyn DirectorySession>> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);

        debug!("Connecting to LDAP server: {}", self.url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(|e| Error::Network(format!("{}: {}", self.url, e)))?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapSession {
            ldap,
            lifecycle: SessionLifecycle::opened(),
        }))
    }
}

/// Session backed by an `ldap3` connection
pub struct LdapSession {
    ldap: Ldap,
    lifecycle: SessionLifecycle,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn bind(&mut self, principal: &str, secret: &str) -> Result<()> {
        self.lifecycle.begin_bind()?;

        let result = self
            .ldap
            .simple_bind(principal, secret)
            .await
            .map_err(|e| Error::Network(format!("Bind failed: {}", e)))?;

        if result.rc != 0 {
            // RC 49 = Invalid credentials; everything else is treated the same
            debug!(principal = %principal, rc = result.rc, "Directory rejected bind");
            return Err(Error::InvalidCredentials);
        }

        self.lifecycle.bind_succeeded();
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        self.lifecycle.begin_search()?;

        debug!(base_dn = %request.base_dn, filter = %request.filter, "Searching directory");

        let (rs, _res) = self
            .ldap
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never))
            .search(
                &request.base_dn,
                Scope::Subtree,
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .map_err(|e| Error::Search(format!("User search failed: {}", e)))?
            .success()
            .map_err(|e| Error::Search(format!("User search error: {}", e)))?;

        let entries: Vec<DirectoryEntry> = rs
            .into_iter()
            .map(|result| DirectoryEntry::from(SearchEntry::construct(result)))
            .collect();

        debug!("Found {} directory entries", entries.len());
        Ok(entries)
    }

    async fn close(&mut self) {
        if !self.lifecycle.close() {
            return;
        }
        if let Err(e) = self.ldap.unbind().await {
            warn!("LDAP unbind failed: {}", e);
        }
    }
}
