//! LDAP Client implementation
//!
//! Answers existence, membership and authentication questions for
//! authorization call sites. Not-found lookups and transport failures are
//! turned into `false` / empty answers here; the member services below
//! report them as errors.

use crate::ldap::member::{MemberResolver, MemberService};
use crate::ldap::normalize::{canonical, looks_like_dn};
use crate::ldap::transport::{LdapTransport, Transport};
use crate::ldap::types::SchemaConfig;
use dirmember_core::{DirectoryConfigSection, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Directory client for existence, membership and bind checks
pub struct LdapClient {
    config: Arc<SchemaConfig>,
    transport: Arc<dyn Transport>,
    members: MemberService,
}

impl LdapClient {
    /// Create a client over an existing transport
    pub fn new(config: SchemaConfig, transport: Arc<dyn Transport>) -> Self {
        let config = Arc::new(config);
        let members = MemberService::new(transport.clone(), config.clone());

        Self {
            config,
            transport,
            members,
        }
    }

    /// Validate the section and connect with `ldap3`
    pub async fn connect(section: &DirectoryConfigSection) -> Result<Self> {
        section.validate()?;

        let transport = LdapTransport::connect(section).await?;
        let client = Self::new(SchemaConfig::from(section), Arc::new(transport));

        info!(
            "LDAP client ready ({:?} schema, base {})",
            client.members.server_type(),
            client.config.base_dn
        );
        Ok(client)
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Whether the login has a directory entry
    pub async fn user_exists(&self, login: &str) -> bool {
        let found = match self.service_bind().await {
            Ok(()) => self.members.find_user(login).await,
            Err(e) => Err(e),
        };

        match found {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                warn!(code = e.code(), "User lookup for {} failed: {}", login, e);
                false
            }
        }
    }

    /// Whether the group has a directory entry
    pub async fn group_exists(&self, gid: &str) -> bool {
        let found = match self.service_bind().await {
            Ok(()) => self.members.find_group(gid).await,
            Err(e) => Err(e),
        };

        match found {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                warn!(code = e.code(), "Group lookup for {} failed: {}", gid, e);
                false
            }
        }
    }

    /// Canonical group names of the user; empty for an unknown user
    pub async fn groups_for_user(&self, login: &str) -> Result<Vec<String>> {
        self.service_bind().await?;

        match self.members.find_user_groups(login).await {
            Ok(groups) => {
                debug!("Found {} groups for user {}", groups.len(), login);
                Ok(groups)
            }
            Err(e) if e.is_not_found() => {
                debug!("User {} not found, no groups", login);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Check the user against candidate groups.
    ///
    /// With `any`, one matching group is enough; otherwise every candidate
    /// must match. An empty candidate list always matches.
    pub async fn is_user_in_groups<S: AsRef<str>>(&self, login: &str, groups: &[S], any: bool) -> bool {
        let user_groups: HashSet<String> = match self.groups_for_user(login).await {
            Ok(user_groups) => user_groups.into_iter().collect(),
            Err(e) => {
                warn!(code = e.code(), "Group lookup for {} failed: {}", login, e);
                return false;
            }
        };

        if groups.is_empty() {
            return true;
        }

        let mut candidates = groups.iter().map(|group| canonical(group.as_ref()));
        if any {
            candidates.any(|group| user_groups.contains(&group))
        } else {
            candidates.all(|group| user_groups.contains(&group))
        }
    }

    /// Canonical logins of the group's members, nested groups included
    /// where the schema has them; empty for an unknown group
    pub async fn users_for_group(&self, gid: &str) -> Result<Vec<String>> {
        self.service_bind().await?;

        match self.members.find_group_members(gid).await {
            Ok(users) => {
                debug!("Found {} members in group {}", users.len(), gid);
                Ok(users)
            }
            Err(e) if e.is_not_found() => {
                debug!("Group {} not found, no members", gid);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Check a password for a login or DN.
    ///
    /// Logins are resolved to a DN through the service account first. Any
    /// failure, including transport errors, is `false`.
    pub async fn authenticate(&self, identity: &str, password: &str) -> bool {
        if password.is_empty() {
            debug!("Refusing empty password for {}", identity);
            return false;
        }

        let dn = match self.resolve_bind_dn(identity).await {
            Ok(Some(dn)) => dn,
            Ok(None) => {
                debug!("No bind DN for {}", identity);
                return false;
            }
            Err(e) => {
                debug!("Could not resolve {}: {}", identity, e);
                return false;
            }
        };

        match self.transport.bind(&dn, password).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(code = e.code(), "Bind as {} failed: {}", dn, e);
                false
            }
        }
    }

    /// Unbind and drop the connection
    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }

    // =========================================================================
    // Private methods
    // =========================================================================

    /// Rebind as the service account, unless lookups run anonymously
    async fn service_bind(&self) -> Result<()> {
        let Some((user, password)) = self.config.service_credentials() else {
            return Ok(());
        };

        self.transport.authenticate(user, password).await
    }

    async fn resolve_bind_dn(&self, identity: &str) -> Result<Option<String>> {
        if looks_like_dn(identity) {
            return Ok(Some(identity.to_string()));
        }

        if self.config.can_search_users() {
            self.service_bind().await?;
            let users = self.members.find_user(identity).await?;
            return Ok(users.into_iter().next().map(|user| user.dn));
        }

        Ok(self.config.bind_dn_for(identity))
    }
}
