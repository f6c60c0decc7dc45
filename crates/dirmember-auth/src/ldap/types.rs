//! Schema configuration
//!
//! Supports:
//! - Generic LDAP (`member` / `memberOf`)
//! - POSIX groups, nested OUs and NIS netgroups
//! - FreeIPA

use dirmember_core::{DirectoryConfigSection, ServerType};
use serde::{Deserialize, Serialize};

// ============================================================================
// Schema Configuration
// ============================================================================

/// Immutable per-directory schema description, shared by every lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Directory flavor
    pub server_type: ServerType,

    /// Base DN for user searches
    pub base_dn: String,

    /// Base DN for group searches
    pub group_base: String,

    /// Login attribute
    pub attr_login: String,

    /// Bind DN template with a {login} placeholder
    pub bind_dn_format: Option<String>,

    /// Groups are NIS netgroups
    pub use_netgroups: bool,

    /// Restriction filter text AND-ed into user searches
    pub search_filter: Option<String>,

    /// Service account DN
    pub service_user: Option<String>,

    /// Service account password
    pub service_pass: Option<String>,

    /// Skip the service bind before lookups
    pub anon_queries: bool,
}

fn default_attr_login() -> String {
    "uid".to_string()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            server_type: ServerType::default(),
            base_dn: String::new(),
            group_base: String::new(),
            attr_login: default_attr_login(),
            bind_dn_format: None,
            use_netgroups: false,
            search_filter: None,
            service_user: None,
            service_pass: None,
            anon_queries: false,
        }
    }
}

impl From<&DirectoryConfigSection> for SchemaConfig {
    fn from(section: &DirectoryConfigSection) -> Self {
        let base_dn = section.base_dn.clone();
        let group_base = section
            .group_base
            .clone()
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| base_dn.clone());

        let bind_dn_format = section.bind_dn_format.clone().or_else(|| {
            match section.server_type {
                ServerType::Posix => Some(format!("uid={{login}},ou=users,{}", base_dn)),
                ServerType::FreeIpa => {
                    Some(format!("uid={{login}},cn=users,cn=accounts,{}", base_dn))
                }
                ServerType::Generic => None,
            }
        });

        Self {
            server_type: section.server_type,
            group_base,
            attr_login: section
                .attr_login
                .clone()
                .filter(|attr| !attr.is_empty())
                .unwrap_or_else(default_attr_login),
            bind_dn_format,
            use_netgroups: section.use_netgroups,
            search_filter: section.search_filter.clone(),
            service_user: section.service_user.clone(),
            service_pass: section.service_pass.clone(),
            anon_queries: section.anon_queries,
            base_dn,
        }
    }
}

impl SchemaConfig {
    /// Build a user bind DN from the template
    pub fn bind_dn_for(&self, login: &str) -> Option<String> {
        self.bind_dn_format
            .as_ref()
            .map(|format| format.replace("{login}", &ldap3::dn_escape(login)))
    }

    /// Service account credentials, when lookups must bind first
    pub fn service_credentials(&self) -> Option<(&str, &str)> {
        if self.anon_queries {
            return None;
        }
        let user = self.service_user.as_deref()?;
        Some((user, self.service_pass.as_deref().unwrap_or("")))
    }

    /// Whether logins can be resolved to DNs with a search
    pub fn can_search_users(&self) -> bool {
        self.anon_queries || self.service_user.is_some()
    }
}
