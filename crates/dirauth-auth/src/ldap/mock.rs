//! In-memory directory for tests
//!
//! Records every session call so tests can assert on protocol sequencing.
//! Filters of the form `(attr=value)` are supported, with `*` as presence.

use crate::ldap::client::{DirectoryConnector, DirectorySession};
use crate::ldap::types::{DirectoryEntry, SearchRequest, SessionLifecycle};
use async_trait::async_trait;
use dirauth_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One observed session operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open,
    Bind(String),
    Search(String),
    Close,
}

#[derive(Default)]
struct MockState {
    unreachable: bool,
    search_failure: Option<String>,
    accounts: HashMap<String, String>,
    entries: Vec<DirectoryEntry>,
    calls: Vec<MockCall>,
    opened: usize,
    closed: usize,
}

/// Shared handle to an in-memory directory; clones see the same state
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept binds for `principal` with `password`
    pub fn with_account(self, principal: &str, password: &str) -> Self {
        self.state
            .lock()
            .accounts
            .insert(principal.to_string(), password.to_string());
        self
    }

    /// Refuse every connection attempt
    pub fn unreachable(self) -> Self {
        self.state.lock().unreachable = true;
        self
    }

    /// Fail every search with the given diagnostic
    pub fn failing_search(self, message: &str) -> Self {
        self.state.lock().search_failure = Some(message.to_string());
        self
    }

    /// Append an entry; searches return entries in insertion order
    pub fn add_entry(&self, entry: DirectoryEntry) {
        self.state.lock().entries.push(entry);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn search_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Search(_)))
            .count()
    }

    /// Sessions opened but not yet closed
    pub fn open_sessions(&self) -> usize {
        let state = self.state.lock();
        state.opened - state.closed
    }
}

#[async_trait]
impl DirectoryConnector for MockDirectory {
    async fn open(&self) -> Result<Box<dyn DirectorySession>> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Open);

        if state.unreachable {
            return Err(Error::Network("mock directory unreachable".into()));
        }

        state.opened += 1;
        Ok(Box::new(MockSession {
            state: self.state.clone(),
            lifecycle: SessionLifecycle::opened(),
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
    lifecycle: SessionLifecycle,
}

#[async_trait]
impl DirectorySession for MockSession {
    async fn bind(&mut self, principal: &str, secret: &str) -> Result<()> {
        self.lifecycle.begin_bind()?;

        let mut state = self.state.lock();
        state.calls.push(MockCall::Bind(principal.to_string()));

        match state.accounts.get(principal) {
            Some(password) if password == secret => {
                self.lifecycle.bind_succeeded();
                Ok(())
            }
            _ => Err(Error::InvalidCredentials),
        }
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        self.lifecycle.begin_search()?;

        let mut state = self.state.lock();
        state.calls.push(MockCall::Search(request.filter.clone()));

        if let Some(ref message) = state.search_failure {
            return Err(Error::Search(message.clone()));
        }

        let (attr, assertion) = parse_filter(&request.filter)
            .ok_or_else(|| Error::Search(format!("unsupported filter: {}", request.filter)))?;

        let base = request.base_dn.to_ascii_lowercase();
        let entries = state
            .entries
            .iter()
            .filter(|e| e.dn.to_ascii_lowercase().ends_with(&base))
            .filter(|e| match &assertion {
                Assertion::Present => e.first_value(&attr).is_some(),
                Assertion::Equals(v) => e.values(&attr).iter().any(|x| x.eq_ignore_ascii_case(v)),
            })
            .map(|e| project(e, &request.attributes))
            .collect();

        Ok(entries)
    }

    async fn close(&mut self) {
        if self.lifecycle.close() {
            let mut state = self.state.lock();
            state.calls.push(MockCall::Close);
            state.closed += 1;
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Assertion {
    /// `(attr=*)`
    Present,
    /// `(attr=value)` with escapes resolved
    Equals(String),
}

/// Presence is decided on the raw text so an escaped `\2a` stays a literal
fn parse_filter(filter: &str) -> Option<(String, Assertion)> {
    let inner = filter.strip_prefix('(')?.strip_suffix(')')?;
    let (attr, raw) = inner.split_once('=')?;
    let assertion = match raw {
        "*" => Assertion::Present,
        value => Assertion::Equals(unescape_filter_value(value)),
    };
    Some((attr.to_string(), assertion))
}

fn unescape_filter_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        let escaped = (b == b'\\')
            .then(|| value.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn project(entry: &DirectoryEntry, attributes: &[String]) -> DirectoryEntry {
    let attrs = entry
        .attrs
        .iter()
        .filter(|(name, _)| attributes.iter().any(|a| a.eq_ignore_ascii_case(name)))
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect();

    DirectoryEntry {
        dn: entry.dn.clone(),
        attrs,
    }
}
