//! Generic LDAP: explicit membership lists, no nesting

use super::{MemberLookup, MemberResolver};
use crate::ldap::filter::Filter;
use crate::ldap::normalize::{canonical, dedup, extract_group_name, extract_group_names, split_rdn};
use async_trait::async_trait;
use dirmember_core::{Error, Result};
use tracing::debug;

pub struct GenericMembers {
    lookup: MemberLookup,
}

impl GenericMembers {
    pub fn new(lookup: MemberLookup) -> Self {
        Self { lookup }
    }

    /// Login for a `member` DN. DNs named by the login attribute are read
    /// directly, anything else is looked up.
    async fn member_login(&self, dn: &str) -> Result<Option<String>> {
        let normalizer = self.lookup.normalizer();
        let rdn_attr = match split_rdn(dn) {
            Some((attr, _, _)) => attr,
            None => return Ok(Some(canonical(dn))),
        };

        if rdn_attr.eq_ignore_ascii_case(&self.lookup.config().attr_login) {
            return Ok(Some(normalizer.extract_login(dn)));
        }

        match self.lookup.find_user_by_dn(dn).await {
            Ok(users) => Ok(users.iter().find_map(|user| normalizer.login_from_entry(user))),
            Err(Error::UserNotFound(_)) => {
                debug!("Member {} has no user entry", dn);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MemberResolver for GenericMembers {
    fn lookup(&self) -> &MemberLookup {
        &self.lookup
    }

    async fn find_user_groups(&self, login: &str) -> Result<Vec<String>> {
        let users = self.lookup.find_user(login).await?;

        if users.iter().any(|user| user.has("memberOf")) {
            let member_of: Vec<&String> = users
                .iter()
                .flat_map(|user| user.values("memberOf"))
                .collect();
            return Ok(extract_group_names(&member_of));
        }

        // No memberOf overlay: ask the groups instead
        let mut groups = Vec::new();
        for user in &users {
            let filter = Filter::eq("member", user.dn.as_str())
                | Filter::eq("uniqueMember", user.dn.as_str());
            let entries = self
                .lookup
                .search(&self.lookup.config().group_base, &filter)
                .await?;

            groups.extend(entries.iter().map(|group| match group.first("cn") {
                Some(cn) => canonical(cn),
                None => extract_group_name(&group.dn),
            }));
        }

        Ok(dedup(groups))
    }

    async fn find_group_members(&self, gid: &str) -> Result<Vec<String>> {
        let groups = self.lookup.find_group(gid).await?;

        let mut members = Vec::new();
        for group in &groups {
            members.extend(group.values("memberUid").iter().map(|uid| canonical(uid)));

            for attr in ["member", "uniqueMember"] {
                for dn in group.values(attr) {
                    if let Some(login) = self.member_login(dn).await? {
                        members.push(login);
                    }
                }
            }
        }

        Ok(dedup(members))
    }
}
