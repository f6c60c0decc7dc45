//! Scripted transport for unit tests

use crate::ldap::entry::DirectoryEntry;
use crate::ldap::filter::Filter;
use crate::ldap::transport::Transport;
use async_trait::async_trait;
use dirmember_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// A call the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search { base: String, filter: String },
    Bind { dn: String },
}

/// Answers searches keyed by `(base, rendered filter)` and binds keyed by
/// `(dn, password)`. Anything unscripted gets an empty result / `false`.
#[derive(Default)]
pub struct MockTransport {
    searches: HashMap<(String, String), Vec<DirectoryEntry>>,
    binds: HashMap<(String, String), bool>,
    fail: bool,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_search(mut self, base: &str, filter: &Filter, entries: Vec<DirectoryEntry>) -> Self {
        self.searches
            .insert((base.to_string(), filter.to_string()), entries);
        self
    }

    pub fn expect_bind(mut self, dn: &str, password: &str, accepted: bool) -> Self {
        self.binds
            .insert((dn.to_string(), password.to_string()), accepted);
        self
    }

    /// Every operation fails with a transport error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Search { .. }))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn search(&self, base: &str, filter: &Filter) -> Result<Vec<DirectoryEntry>> {
        let filter = filter.to_string();
        self.calls.lock().unwrap().push(Call::Search {
            base: base.to_string(),
            filter: filter.clone(),
        });

        if self.fail {
            return Err(Error::Directory("connection reset".into()));
        }

        Ok(self
            .searches
            .get(&(base.to_string(), filter))
            .cloned()
            .unwrap_or_default())
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<bool> {
        self.calls.lock().unwrap().push(Call::Bind { dn: dn.to_string() });

        if self.fail {
            return Err(Error::Directory("connection reset".into()));
        }

        Ok(self
            .binds
            .get(&(dn.to_string(), password.to_string()))
            .copied()
            .unwrap_or(false))
    }
}
