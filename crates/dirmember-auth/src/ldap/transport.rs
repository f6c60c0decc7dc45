//! Directory transport
//!
//! The member services only need subtree search and simple bind. `LdapTransport`
//! provides both over an `ldap3` connection; tests substitute a scripted mock.

use crate::ldap::entry::DirectoryEntry;
use crate::ldap::filter::Filter;
use async_trait::async_trait;
use dirmember_core::{DirectoryConfigSection, Error, Result};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, info, warn};

/// LDAP result code for a search base that does not exist
const RC_NO_SUCH_OBJECT: u32 = 32;

/// Search and bind operations the member services are written against
#[async_trait]
pub trait Transport: Send + Sync {
    /// Subtree search under `base`; zero matches is an empty vec, not an error
    async fn search(&self, base: &str, filter: &Filter) -> Result<Vec<DirectoryEntry>>;

    /// Simple bind; `Ok(false)` means the server rejected the credentials
    async fn bind(&self, dn: &str, password: &str) -> Result<bool>;

    /// Bind that treats rejected credentials as an error
    async fn authenticate(&self, dn: &str, password: &str) -> Result<()> {
        if self.bind(dn, password).await? {
            Ok(())
        } else {
            Err(Error::Directory(format!("Invalid credentials for {}", dn)))
        }
    }

    /// Release the connection
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// `ldap3` backed transport
pub struct LdapTransport {
    ldap: Ldap,
}

impl LdapTransport {
    /// Connect with the section's TLS and timeout settings
    pub async fn connect(section: &DirectoryConfigSection) -> Result<Self> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(section.timeout_seconds))
            .set_starttls(section.start_tls)
            .set_no_tls_verify(section.skip_tls_verify);

        debug!("Connecting to LDAP server: {}", section.server_url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &section.server_url)
            .await
            .map_err(|e| Error::Directory(format!("Failed to connect to LDAP server: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection error: {}", e);
            }
        });

        info!("Connected to LDAP server: {}", section.server_url);
        Ok(Self { ldap })
    }
}

#[async_trait]
impl Transport for LdapTransport {
    async fn search(&self, base: &str, filter: &Filter) -> Result<Vec<DirectoryEntry>> {
        let filter = filter.to_string();
        debug!("Searching under {} with filter: {}", base, filter);

        let mut ldap = self.ldap.clone();
        let result = ldap
            .search(base, Scope::Subtree, &filter, vec!["*"])
            .await
            .map_err(|e| Error::Directory(format!("Search failed: {}", e)))?;

        if result.1.rc == RC_NO_SUCH_OBJECT {
            debug!("Search base does not exist: {}", base);
            return Ok(Vec::new());
        }

        let (rs, _res) = result
            .success()
            .map_err(|e| Error::Directory(format!("Search error: {}", e)))?;

        Ok(rs
            .into_iter()
            .map(|entry| DirectoryEntry::from(SearchEntry::construct(entry)))
            .collect())
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<bool> {
        let mut ldap = self.ldap.clone();
        let result = ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| Error::Directory(format!("Bind failed: {}", e)))?;

        if result.rc != 0 {
            debug!("Bind as {} rejected with code: {}", dn, result.rc);
        }

        Ok(result.rc == 0)
    }

    async fn close(&self) -> Result<()> {
        let mut ldap = self.ldap.clone();
        ldap.unbind()
            .await
            .map_err(|e| Error::Directory(format!("Unbind failed: {}", e)))
    }
}
