//! Directory entry, search request and session lifecycle types

use dirauth_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Directory Entry
// ============================================================================

/// Raw directory entry: a DN and its multi-valued attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry DN (Distinguished Name)
    pub dn: String,

    /// Attribute values keyed by attribute name
    #[serde(default)]
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Builder-style helper to add a single-valued attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.entry(name.into()).or_default().push(value.into());
        self
    }

    /// All values of an attribute. Attribute names are case-insensitive.
    pub fn values(&self, name: &str) -> &[String] {
        if let Some(values) = self.attrs.get(name) {
            return values;
        }
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of an attribute, `None` when absent or empty
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.values(name)
            .first()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
        }
    }
}

// ============================================================================
// Search Request
// ============================================================================

/// Subtree search, aliases never dereferenced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base_dn: String,
    pub filter: String,
    pub attributes: Vec<String>,
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// State of a single-use directory session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no bind attempted yet
    Opened,
    /// Bind sent; stays here if the server rejected it
    Binding,
    Bound,
    Searched,
    Closed,
}

/// Enforces `Opened -> Bound -> [Searched] -> Closed` with one bind and one
/// search per session
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    state: SessionState,
}

impl SessionLifecycle {
    pub fn opened() -> Self {
        Self {
            state: SessionState::Opened,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn begin_bind(&mut self) -> Result<()> {
        match self.state {
            SessionState::Opened => {
                self.state = SessionState::Binding;
                Ok(())
            }
            other => Err(Error::Session(format!("bind not allowed in state {:?}", other))),
        }
    }

    pub fn bind_succeeded(&mut self) {
        if self.state == SessionState::Binding {
            self.state = SessionState::Bound;
        }
    }

    pub fn begin_search(&mut self) -> Result<()> {
        match self.state {
            SessionState::Bound => {
                self.state = SessionState::Searched;
                Ok(())
            }
            other => Err(Error::Session(format!("search not allowed in state {:?}", other))),
        }
    }

    /// Returns `true` only for the first close
    pub fn close(&mut self) -> bool {
        let was_open = self.state != SessionState::Closed;
        self.state = SessionState::Closed;
        was_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_is_case_insensitive() {
        let entry = DirectoryEntry::new("CN=alice,OU=Staff,DC=x,DC=com")
            .with_attr("sAMAccountName", "alice")
            .with_attr("mail", "");

        assert_eq!(entry.first_value("sAMAccountName"), Some("alice"));
        assert_eq!(entry.first_value("samaccountname"), Some("alice"));
        assert_eq!(entry.first_value("mail"), None);
        assert_eq!(entry.first_value("memberOf"), None);
        assert!(entry.values("memberOf").is_empty());
    }

    #[test]
    fn test_first_value_of_multi_valued_attribute() {
        let entry = DirectoryEntry::new("CN=alice")
            .with_attr("memberOf", "CN=Eng,OU=Product,DC=x")
            .with_attr("memberOf", "CN=Ops,OU=Infra,DC=x");

        assert_eq!(entry.values("memberOf").len(), 2);
        assert_eq!(entry.first_value("memberOf"), Some("CN=Eng,OU=Product,DC=x"));
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let mut lifecycle = SessionLifecycle::opened();
        lifecycle.begin_bind().unwrap();
        lifecycle.bind_succeeded();
        assert_eq!(lifecycle.state(), SessionState::Bound);
        lifecycle.begin_search().unwrap();
        assert!(lifecycle.close());
        assert!(!lifecycle.close());
        assert_eq!(lifecycle.state(), SessionState::Closed);
    }

    #[test]
    fn test_lifecycle_rejects_second_bind_and_search() {
        let mut lifecycle = SessionLifecycle::opened();
        lifecycle.begin_bind().unwrap();
        lifecycle.bind_succeeded();
        assert!(lifecycle.begin_bind().is_err());

        lifecycle.begin_search().unwrap();
        assert!(lifecycle.begin_search().is_err());
    }

    #[test]
    fn test_lifecycle_search_after_rejected_bind() {
        let mut lifecycle = SessionLifecycle::opened();
        lifecycle.begin_bind().unwrap();
        assert!(matches!(lifecycle.begin_search(), Err(Error::Session(_))));
        assert!(lifecycle.begin_bind().is_err());
    }

    #[test]
    fn test_lifecycle_closed_session_is_inert() {
        let mut lifecycle = SessionLifecycle::opened();
        assert!(lifecycle.close());
        assert!(lifecycle.begin_bind().is_err());
        assert!(lifecycle.begin_search().is_err());
    }
}
