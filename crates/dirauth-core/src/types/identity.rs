//! Identity types

use serde::{Deserialize, Serialize};

/// Username/password pair supplied by a caller or the service account
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields are required and must be non-empty
    pub fn validate(&self) -> crate::Result<()> {
        if self.username.trim().is_empty() {
            return Err(crate::Error::InvalidRequest("username is required".into()));
        }
        if self.password.is_empty() {
            return Err(crate::Error::InvalidRequest("password is required".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Flattened identity built from one directory entry.
///
/// `authenticated` travels as `status` on the wire; empty fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(rename = "status")]
    pub authenticated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nickname: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub department: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub organization: String,
}

impl IdentityRecord {
    /// Bare status/message record used for errors and informational replies
    pub fn status(authenticated: bool, message: impl Into<String>) -> Self {
        Self {
            authenticated,
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Result of a successful user bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials accepted and a complete profile was found
    Verified(IdentityRecord),
    /// Credentials accepted but no directory entry carried a complete profile
    ProfileIncomplete { username: String },
}

impl AuthOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, AuthOutcome::Verified(_))
    }

    pub fn record(&self) -> Option<&IdentityRecord> {
        match self {
            AuthOutcome::Verified(record) => Some(record),
            AuthOutcome::ProfileIncomplete { .. } => None,
        }
    }

    /// Record sent back to the caller
    pub fn into_record(self) -> IdentityRecord {
        match self {
            AuthOutcome::Verified(record) => record,
            AuthOutcome::ProfileIncomplete { username } => IdentityRecord {
                authenticated: true,
                username,
                message: Some("Profile Incomplete!".to_string()),
                ..Default::default()
            },
        }
    }
}
