//! User authentication flow
//!
//! A successful bind as `username@domain` is the only proof of identity.
//! The profile is then fetched either as the service account (default) or on
//! the user-bound session, and the first complete entry wins.

use crate::ldap::client::{DirectoryConnector, DirectorySession};
use crate::ldap::normalizer::normalize;
use crate::ldap::query::{DirectoryQuery, UserFilter};
use crate::ldap::types::DirectoryEntry;
use dirauth_core::config::{DirectoryConfig, ProfileLookup};
use dirauth_core::types::AuthOutcome;
use dirauth_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Authenticates end users against the directory
pub struct UserAuthenticator {
    connector: Arc<dyn DirectoryConnector>,
    config: Arc<DirectoryConfig>,
    query: Arc<DirectoryQuery>,
}

impl UserAuthenticator {
    pub fn new(
        connector: Arc<dyn DirectoryConnector>,
        config: Arc<DirectoryConfig>,
        query: Arc<DirectoryQuery>,
    ) -> Self {
        Self {
            connector,
            config,
            query,
        }
    }

    /// Authenticate a user with username and password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthOutcome> {
        // An empty password would turn the simple bind into an anonymous bind
        if password.is_empty() {
            warn!(username = %username, "Rejecting empty password without contacting directory");
            return Err(Error::InvalidCredentials);
        }

        let bound_entries = {
            let mut session = self.connector.open().await.map_err(|e| {
                warn!("Directory unreachable: {}", e);
                e
            })?;
            let result = self.bind_user(session.as_mut(), username, password).await;
            session.close().await;
            result?
        };

        let entries = match bound_entries {
            Some(entries) => entries,
            None => self.lookup_profile(username).await?,
        };

        let outcome = match entries.iter().find_map(normalize) {
            Some(record) => AuthOutcome::Verified(record),
            None => {
                warn!(
                    username = %username,
                    entries = entries.len(),
                    "Authenticated but no complete directory profile"
                );
                AuthOutcome::ProfileIncomplete {
                    username: username.to_string(),
                }
            }
        };

        info!(username = %username, verified = outcome.is_verified(), "User authenticated");
        Ok(outcome)
    }

    /// Bind as the user; in `BoundUser` mode also search on this session
    async fn bind_user(
        &self,
        session: &mut dyn DirectorySession,
        username: &str,
        password: &str,
    ) -> Result<Option<Vec<DirectoryEntry>>> {
        let principal = self.config.user_principal(username);

        if let Err(e) = session.bind(&principal, password).await {
            if matches!(e, Error::InvalidCredentials) {
                warn!(principal = %principal, "User bind rejected");
            }
            return Err(e);
        }

        debug!(principal = %principal, "User bind accepted");

        match self.config.profile_lookup {
            ProfileLookup::BoundUser => self
                .query
                .search_with(session, UserFilter::One(username))
                .await
                .map(Some),
            ProfileLookup::ServiceAccount => Ok(None),
        }
    }

    async fn lookup_profile(&self, username: &str) -> Result<Vec<DirectoryEntry>> {
        self.query.find_user(username).await.map_err(|e| match e {
            // The caller's credentials were fine; this is our problem
            Error::ServiceBindRejected => {
                Error::Search("service account rejected during profile lookup".into())
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::mock::{MockCall, MockDirectory};
    use dirauth_core::types::IdentityRecord;

    fn config(profile_lookup: ProfileLookup) -> Arc<DirectoryConfig> {
        Arc::new(DirectoryConfig {
            domain: "x.com".to_string(),
            base_dn: "DC=x,DC=com".to_string(),
            service_principal: "svc@x.com".to_string(),
            service_password: "svc-pw".to_string(),
            profile_lookup,
            ..Default::default()
        })
    }

    fn authenticator(directory: &MockDirectory, profile_lookup: ProfileLookup) -> UserAuthenticator {
        let config = config(profile_lookup);
        let connector: Arc<dyn DirectoryConnector> = Arc::new(directory.clone());
        let query = Arc::new(DirectoryQuery::new(
            connector.clone(),
            config.clone(),
            config.service_credential().unwrap(),
        ));
        UserAuthenticator::new(connector, config, query)
    }

    fn alice() -> DirectoryEntry {
        DirectoryEntry::new("CN=Alice A,OU=Product,DC=x,DC=com")
            .with_attr("mail", "a@x.com")
            .with_attr("sAMAccountName", "alice")
            .with_attr("name", "Alice A")
            .with_attr("memberOf", "CN=Eng,OU=Product,DC=x,DC=com")
    }

    fn directory() -> MockDirectory {
        let directory = MockDirectory::new()
            .with_account("svc@x.com", "svc-pw")
            .with_account("alice@x.com", "correct horse");
        directory.add_entry(alice());
        directory
    }

    #[tokio::test]
    async fn test_successful_authentication() {
        let directory = directory();
        let outcome = authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("alice", "correct horse")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AuthOutcome::Verified(IdentityRecord {
                email: "a@x.com".to_string(),
                authenticated: true,
                message: None,
                username: "alice".to_string(),
                nickname: "Alice A".to_string(),
                department: "Eng".to_string(),
                organization: "Product".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_two_phase_sequence() {
        let directory = directory();
        authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("alice", "correct horse")
            .await
            .unwrap();

        assert_eq!(
            directory.calls(),
            vec![
                MockCall::Open,
                MockCall::Bind("alice@x.com".to_string()),
                MockCall::Close,
                MockCall::Open,
                MockCall::Bind("svc@x.com".to_string()),
                MockCall::Search("(sAMAccountName=alice)".to_string()),
                MockCall::Close,
            ]
        );
        assert_eq!(directory.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_bound_user_lookup_uses_single_session() {
        let directory = directory();
        let outcome = authenticator(&directory, ProfileLookup::BoundUser)
            .authenticate("alice", "correct horse")
            .await
            .unwrap();

        assert!(outcome.is_verified());
        assert_eq!(
            directory.calls(),
            vec![
                MockCall::Open,
                MockCall::Bind("alice@x.com".to_string()),
                MockCall::Search("(sAMAccountName=alice)".to_string()),
                MockCall::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_wrong_password_never_searches() {
        for mode in [ProfileLookup::ServiceAccount, ProfileLookup::BoundUser] {
            let directory = directory();
            let err = authenticator(&directory, mode)
                .authenticate("alice", "wrong")
                .await
                .unwrap_err();

            assert!(matches!(err, Error::InvalidCredentials));
            assert_eq!(err.http_status(), 401);
            assert_eq!(err.public_message(), "Username or Password Error!");
            assert_eq!(directory.search_count(), 0);
            assert_eq!(
                directory.calls(),
                vec![
                    MockCall::Open,
                    MockCall::Bind("alice@x.com".to_string()),
                    MockCall::Close,
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_empty_password_is_rejected_locally() {
        let directory = directory();
        let err = authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("alice", "")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidCredentials));
        assert!(directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_network_error() {
        let directory = directory().unreachable();
        let err = authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("alice", "correct horse")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert_eq!(err.public_message(), "Network Error!");
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn test_search_failure() {
        for mode in [ProfileLookup::ServiceAccount, ProfileLookup::BoundUser] {
            let directory = directory().failing_search("rc=1 operationsError");
            let err = authenticator(&directory, mode)
                .authenticate("alice", "correct horse")
                .await
                .unwrap_err();

            assert!(matches!(err, Error::Search(_)));
            assert_eq!(err.public_message(), "Server Error!");
            assert_eq!(directory.open_sessions(), 0);
        }
    }

    #[tokio::test]
    async fn test_rejected_service_account_is_server_error() {
        let directory = MockDirectory::new()
            .with_account("svc@x.com", "rotated")
            .with_account("alice@x.com", "correct horse");
        directory.add_entry(alice());

        let err = authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("alice", "correct horse")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Search(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn test_no_matching_entry_is_profile_incomplete() {
        let directory = MockDirectory::new()
            .with_account("svc@x.com", "svc-pw")
            .with_account("dave@x.com", "pw");
        directory.add_entry(alice());

        let outcome = authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("dave", "pw")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AuthOutcome::ProfileIncomplete {
                username: "dave".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_incomplete_entry_is_profile_incomplete() {
        let directory = MockDirectory::new()
            .with_account("svc@x.com", "svc-pw")
            .with_account("erin@x.com", "pw");
        directory.add_entry(
            DirectoryEntry::new("CN=Erin,DC=x,DC=com")
                .with_attr("sAMAccountName", "erin")
                .with_attr("name", "Erin")
                .with_attr("memberOf", "CN=Eng,OU=Product,DC=x"),
        );

        let outcome = authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("erin", "pw")
            .await
            .unwrap();

        assert!(!outcome.is_verified());
        let record = outcome.into_record();
        assert!(record.authenticated);
        assert_eq!(record.email, "");
    }

    #[tokio::test]
    async fn test_first_complete_entry_wins() {
        let directory = MockDirectory::new()
            .with_account("svc@x.com", "svc-pw")
            .with_account("frank@x.com", "pw");
        directory.add_entry(
            DirectoryEntry::new("CN=Frank Old,DC=x,DC=com")
                .with_attr("sAMAccountName", "frank")
                .with_attr("name", "Frank Old")
                .with_attr("memberOf", "CN=Legacy,OU=Archive,DC=x"),
        );
        directory.add_entry(
            DirectoryEntry::new("CN=Frank,DC=x,DC=com")
                .with_attr("mail", "f@x.com")
                .with_attr("sAMAccountName", "frank")
                .with_attr("name", "Frank")
                .with_attr("memberOf", "CN=Eng,OU=Product,DC=x"),
        );
        directory.add_entry(
            DirectoryEntry::new("CN=Frank Dup,DC=x,DC=com")
                .with_attr("mail", "f2@x.com")
                .with_attr("sAMAccountName", "frank")
                .with_attr("name", "Frank Dup")
                .with_attr("memberOf", "CN=Ops,OU=Infra,DC=x"),
        );

        let outcome = authenticator(&directory, ProfileLookup::ServiceAccount)
            .authenticate("frank", "pw")
            .await
            .unwrap();

        let record = outcome.record().unwrap();
        assert_eq!(record.email, "f@x.com");
        assert_eq!(record.department, "Eng");
    }
}
