//! Directory query flow (service account)

use crate::ldap::client::{DirectoryConnector, DirectorySession};
use crate::ldap::normalizer::normalize;
use crate::ldap::types::{DirectoryEntry, SearchRequest};
use dirauth_core::config::DirectoryConfig;
use dirauth_core::types::{Credential, IdentityRecord};
use dirauth_core::{Error, Result, USER_ATTRIBUTES};
use ldap3::ldap_escape;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which accounts a user search matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter<'a> {
    /// Exactly this account name (escaped before substitution)
    One(&'a str),
    /// Every account under the base DN
    All,
}

/// Substitute the target into a `{username}` filter template
pub fn build_user_filter(template: &str, target: UserFilter<'_>) -> String {
    let value = match target {
        UserFilter::One(username) => ldap_escape(username),
        UserFilter::All => Cow::Borrowed("*"),
    };
    template.replace("{username}", &value)
}

/// Searches the directory as the configured service account
pub struct DirectoryQuery {
    connector: Arc<dyn DirectoryConnector>,
    config: Arc<DirectoryConfig>,
    service: Credential,
}

impl DirectoryQuery {
    pub fn new(
        connector: Arc<dyn DirectoryConnector>,
        config: Arc<DirectoryConfig>,
        service: Credential,
    ) -> Self {
        Self {
            connector,
            config,
            service,
        }
    }

    /// Search request for the configured base DN and attribute list
    pub fn search_request(&self, target: UserFilter<'_>) -> SearchRequest {
        SearchRequest {
            base_dn: self.config.base_dn.clone(),
            filter: build_user_filter(&self.config.user_filter, target),
            attributes: USER_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Every complete entry under the base DN, in server order
    pub async fn list_users(&self) -> Result<Vec<IdentityRecord>> {
        let entries = self.fetch(UserFilter::All).await?;
        let total = entries.len();

        let users: Vec<IdentityRecord> = entries.iter().filter_map(normalize).collect();

        info!(
            returned = total,
            complete = users.len(),
            "Directory listing completed"
        );
        Ok(users)
    }

    /// Raw entries for one account name
    pub async fn find_user(&self, username: &str) -> Result<Vec<DirectoryEntry>> {
        self.fetch(UserFilter::One(username)).await
    }

    /// Search on a session that is already bound
    pub async fn search_with(
        &self,
        session: &mut dyn DirectorySession,
        target: UserFilter<'_>,
    ) -> Result<Vec<DirectoryEntry>> {
        session.search(&self.search_request(target)).await
    }

    async fn fetch(&self, target: UserFilter<'_>) -> Result<Vec<DirectoryEntry>> {
        let mut session = self.connector.open().await.map_err(|e| {
            warn!("Directory unreachable: {}", e);
            e
        })?;

        let result = self.bind_and_search(session.as_mut(), target).await;
        session.close().await;
        result
    }

    async fn bind_and_search(
        &self,
        session: &mut dyn DirectorySession,
        target: UserFilter<'_>,
    ) -> Result<Vec<DirectoryEntry>> {
        session
            .bind(&self.service.username, &self.service.password)
            .await
            .map_err(|e| match e {
                Error::InvalidCredentials => {
                    warn!(principal = %self.service.username, "Service account bind rejected");
                    Error::ServiceBindRejected
                }
                other => other,
            })?;

        debug!(principal = %self.service.username, "Service account bound");

        self.search_with(session, target).await
    }
}
