//! FreeIPA
//!
//! Users carry `memberOf` with the DNs of their groups. Some values are
//! `ipaUniqueID=...` references (HBAC and sudo rules, for instance), which
//! take a second search to turn into a name.

use super::{MemberLookup, MemberResolver};
use crate::ldap::entry::DirectoryEntry;
use crate::ldap::filter::Filter;
use crate::ldap::normalize::{canonical, dedup, extract_group_name, split_rdn};
use async_trait::async_trait;
use dirmember_core::{Error, Result};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

const UNIQUE_ID_ATTRIBUTE: &str = "ipaUniqueID";

pub struct FreeIpaMembers {
    lookup: MemberLookup,
}

impl FreeIpaMembers {
    pub fn new(lookup: MemberLookup) -> Self {
        Self { lookup }
    }

    fn is_unique_id_reference(value: &str) -> bool {
        split_rdn(value).is_some_and(|(attr, _, _)| attr.eq_ignore_ascii_case(UNIQUE_ID_ATTRIBUTE))
    }

    /// Group DNs live in a `cn=groups` container
    fn is_group_dn(dn: &str) -> bool {
        dn.split(',')
            .any(|component| component.trim().eq_ignore_ascii_case("cn=groups"))
    }

    /// Whether a `member` DN is named by a login attribute. Hosts and
    /// services (`fqdn=`, `krbprincipalname=`) are not.
    fn is_user_dn(&self, dn: &str) -> bool {
        split_rdn(dn).is_some_and(|(attr, _, _)| {
            self.lookup
                .normalizer()
                .login_attributes()
                .iter()
                .any(|login_attr| login_attr.eq_ignore_ascii_case(&attr))
        })
    }

    /// Name of the entry an `ipaUniqueID` reference points at
    async fn resolve_reference(&self, reference: &str) -> Result<Option<String>> {
        let entries = self
            .lookup
            .search(reference, &Filter::present("objectClass"))
            .await?;

        let name = entries.iter().find_map(|entry| entry.first("cn")).map(canonical);
        if name.is_none() {
            debug!("Unresolved membership reference: {}", reference);
        }
        Ok(name)
    }
}

#[async_trait]
impl MemberResolver for FreeIpaMembers {
    fn lookup(&self) -> &MemberLookup {
        &self.lookup
    }

    async fn find_user_groups(&self, login: &str) -> Result<Vec<String>> {
        let users = self.lookup.find_user(login).await?;

        let mut groups = Vec::new();
        for value in users.iter().flat_map(|user| user.values("memberOf")) {
            if Self::is_unique_id_reference(value) {
                if let Some(name) = self.resolve_reference(value).await? {
                    groups.push(name);
                }
            } else {
                groups.push(extract_group_name(value));
            }
        }

        Ok(dedup(groups))
    }

    async fn find_group_members(&self, gid: &str) -> Result<Vec<String>> {
        let mut pending: VecDeque<DirectoryEntry> = self.lookup.find_group(gid).await?.into();
        let mut visited = HashSet::new();
        let mut members = Vec::new();

        while let Some(group) = pending.pop_front() {
            if !visited.insert(group.dn.to_lowercase()) {
                debug!("Group {} already traversed", group.dn);
                continue;
            }

            for member in group.values("member") {
                if !Self::is_group_dn(member) {
                    if self.is_user_dn(member) {
                        members.push(self.lookup.normalizer().extract_login(member));
                    } else {
                        debug!("Skipping non-user member {}", member);
                    }
                    continue;
                }

                if visited.contains(&member.to_lowercase()) {
                    continue;
                }
                match self.lookup.find_group(&extract_group_name(member)).await {
                    Ok(nested) => pending.extend(nested),
                    Err(Error::GroupNotFound(_)) => debug!("Nested group {} does not exist", member),
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(dedup(members))
    }
}
