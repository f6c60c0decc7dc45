//! Group membership resolution
//!
//! Each directory flavor stores membership differently:
//! - generic: `memberOf` on users, `member` / `uniqueMember` on groups
//! - POSIX: `memberUid` on `posixGroup`s, groups nested as sub-entries,
//!   or NIS netgroup triples
//! - FreeIPA: `memberOf` on users, partly as `ipaUniqueID` references
//!
//! `MemberService` is the closed set of these strategies, picked once from
//! the configured server type.

mod free_ipa;
mod generic;
mod posix;

pub use free_ipa::FreeIpaMembers;
pub use generic::GenericMembers;
pub use posix::PosixMembers;

use crate::ldap::entry::DirectoryEntry;
use crate::ldap::filter::Filter;
use crate::ldap::normalize::{split_rdn, Normalizer, GROUP_NAME_ATTRIBUTE};
use crate::ldap::transport::Transport;
use crate::ldap::types::SchemaConfig;
use async_trait::async_trait;
use dirmember_core::{Error, Result, ServerType};
use std::sync::Arc;
use tracing::warn;

/// Lookups shared by every schema
pub struct MemberLookup {
    transport: Arc<dyn Transport>,
    config: Arc<SchemaConfig>,
    restriction: Option<Filter>,
    normalizer: Normalizer,
}

impl MemberLookup {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<SchemaConfig>) -> Self {
        let restriction = restriction_filter(config.search_filter.as_deref());
        let normalizer = Normalizer::new(&config.attr_login);

        Self {
            transport,
            config,
            restriction,
            normalizer,
        }
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// The validated restriction filter, if one is configured and well formed
    pub fn restriction(&self) -> Option<&Filter> {
        self.restriction.as_ref()
    }

    /// `(attr_login=login)`, AND-ed with the restriction filter
    pub fn name_filter(&self, login: &str) -> Filter {
        self.name_filter_with(&self.config.attr_login, login)
    }

    pub fn name_filter_with(&self, attr: &str, value: &str) -> Filter {
        let filter = Filter::eq(attr, value);
        match &self.restriction {
            Some(restriction) => filter & restriction.clone(),
            None => filter,
        }
    }

    /// `(cn=gid)`
    pub fn group_filter(&self, gid: &str) -> Filter {
        Filter::eq(GROUP_NAME_ATTRIBUTE, gid)
    }

    pub async fn search(&self, base: &str, filter: &Filter) -> Result<Vec<DirectoryEntry>> {
        self.transport.search(base, filter).await
    }

    /// User entries for a login; `UserNotFound` when there are none
    pub async fn find_user(&self, login: &str) -> Result<Vec<DirectoryEntry>> {
        let users = self
            .search(&self.config.base_dn, &self.name_filter(login))
            .await?;

        if users.is_empty() {
            return Err(Error::UserNotFound(login.to_string()));
        }
        Ok(users)
    }

    /// User entries for a DN, searched by its leading RDN under its parent
    pub async fn find_user_by_dn(&self, dn: &str) -> Result<Vec<DirectoryEntry>> {
        let (attr, value, parent) =
            split_rdn(dn).ok_or_else(|| Error::InvalidDn(dn.to_string()))?;

        let users = self
            .search(&parent, &self.name_filter_with(&attr, &value))
            .await?;

        if users.is_empty() {
            return Err(Error::UserNotFound(dn.to_string()));
        }
        Ok(users)
    }

    /// Group entries for a group name; `GroupNotFound` when there are none
    pub async fn find_group(&self, gid: &str) -> Result<Vec<DirectoryEntry>> {
        let groups = self
            .search(&self.config.group_base, &self.group_filter(gid))
            .await?;

        if groups.is_empty() {
            return Err(Error::GroupNotFound(gid.to_string()));
        }
        Ok(groups)
    }
}

/// Parses the configured restriction. A malformed one is logged and
/// dropped; lookups then run unrestricted.
fn restriction_filter(text: Option<&str>) -> Option<Filter> {
    let text = text.filter(|text| !text.trim().is_empty())?;

    match Filter::parse(text) {
        Ok(filter) => Some(filter),
        Err(e) => {
            warn!(filter = text, "Search filter unavailable - {}", e);
            None
        }
    }
}

/// Membership operations every schema answers
#[async_trait]
pub trait MemberResolver: Send + Sync {
    fn lookup(&self) -> &MemberLookup;

    async fn find_user(&self, login: &str) -> Result<Vec<DirectoryEntry>> {
        self.lookup().find_user(login).await
    }

    async fn find_user_by_dn(&self, dn: &str) -> Result<Vec<DirectoryEntry>> {
        self.lookup().find_user_by_dn(dn).await
    }

    async fn find_group(&self, gid: &str) -> Result<Vec<DirectoryEntry>> {
        self.lookup().find_group(gid).await
    }

    /// Canonical names of the user's groups, in directory order
    async fn find_user_groups(&self, login: &str) -> Result<Vec<String>>;

    /// Canonical logins of the group's members
    async fn find_group_members(&self, gid: &str) -> Result<Vec<String>>;
}

/// Schema-specific resolver, selected once per client
pub enum MemberService {
    Generic(GenericMembers),
    Posix(PosixMembers),
    FreeIpa(FreeIpaMembers),
}

impl MemberService {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<SchemaConfig>) -> Self {
        let server_type = config.server_type;
        let lookup = MemberLookup::new(transport, config);

        match server_type {
            ServerType::Generic => MemberService::Generic(GenericMembers::new(lookup)),
            ServerType::Posix => MemberService::Posix(PosixMembers::new(lookup)),
            ServerType::FreeIpa => MemberService::FreeIpa(FreeIpaMembers::new(lookup)),
        }
    }

    pub fn server_type(&self) -> ServerType {
        match self {
            MemberService::Generic(_) => ServerType::Generic,
            MemberService::Posix(_) => ServerType::Posix,
            MemberService::FreeIpa(_) => ServerType::FreeIpa,
        }
    }
}

#[async_trait]
impl MemberResolver for MemberService {
    fn lookup(&self) -> &MemberLookup {
        match self {
            MemberService::Generic(members) => members.lookup(),
            MemberService::Posix(members) => members.lookup(),
            MemberService::FreeIpa(members) => members.lookup(),
        }
    }

    async fn find_user_groups(&self, login: &str) -> Result<Vec<String>> {
        match self {
            MemberService::Generic(members) => members.find_user_groups(login).await,
            MemberService::Posix(members) => members.find_user_groups(login).await,
            MemberService::FreeIpa(members) => members.find_user_groups(login).await,
        }
    }

    async fn find_group_members(&self, gid: &str) -> Result<Vec<String>> {
        match self {
            MemberService::Generic(members) => members.find_group_members(gid).await,
            MemberService::Posix(members) => members.find_group_members(gid).await,
            MemberService::FreeIpa(members) => members.find_group_members(gid).await,
        }
    }
}
