//! POSIX groups, nested group containers and NIS netgroups
//!
//! Directories without membership attributes model nesting by placing
//! groups below each other, e.g.
//! `cn=myusers,cn=ldapusers,ou=groups,dc=example,dc=com`. Members of a
//! group are therefore collected from every group-class entry in the
//! group's subtree. Netgroups nest by name through `memberNisNetgroup`.

use super::{MemberLookup, MemberResolver};
use crate::ldap::entry::DirectoryEntry;
use crate::ldap::filter::Filter;
use crate::ldap::normalize::{canonical, dedup, extract_group_name, netgroup_users, split_rdn};
use async_trait::async_trait;
use dirmember_core::{Error, Result};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

const GROUP_CLASSES: [&str; 4] = [
    "posixGroup",
    "organizationalUnit",
    "groupOfUniqueNames",
    "groupOfNames",
];

const NETGROUP_CLASS: &str = "nisNetgroup";

pub struct PosixMembers {
    lookup: MemberLookup,
}

impl PosixMembers {
    pub fn new(lookup: MemberLookup) -> Self {
        Self { lookup }
    }

    /// Object classes that count as groups for this directory
    pub fn group_class_filter(&self) -> Filter {
        if self.lookup.config().use_netgroups {
            Filter::class(NETGROUP_CLASS)
        } else {
            Filter::any_class(GROUP_CLASSES)
        }
    }

    fn group_name(entry: &DirectoryEntry) -> String {
        match entry.first("cn") {
            Some(cn) => canonical(cn),
            None => extract_group_name(&entry.dn),
        }
    }

    /// Whether a `member` DN names a user rather than a nested group
    fn is_user_dn(&self, dn: &str) -> bool {
        let attr_login = &self.lookup.config().attr_login;
        split_rdn(dn).map_or(true, |(attr, _, _)| {
            attr.eq_ignore_ascii_case(attr_login) || attr.eq_ignore_ascii_case("uid")
        })
    }

    /// Login for a member DN that turned out not to be a group
    async fn member_login(&self, dn: &str) -> Result<String> {
        let normalizer = self.lookup.normalizer();

        match self.lookup.find_user_by_dn(dn).await {
            Ok(users) => Ok(users
                .iter()
                .find_map(|user| normalizer.login_from_entry(user))
                .unwrap_or_else(|| normalizer.extract_login(dn))),
            Err(Error::UserNotFound(_)) | Err(Error::InvalidDn(_)) => {
                debug!("Member {} has no user entry", dn);
                Ok(normalizer.extract_login(dn))
            }
            Err(e) => Err(e),
        }
    }

    async fn netgroups_for_user(&self, login: &str) -> Result<Vec<String>> {
        let login = canonical(login);
        let netgroups = self
            .lookup
            .search(&self.lookup.config().group_base, &Filter::class(NETGROUP_CLASS))
            .await?;

        Ok(netgroups
            .iter()
            .filter(|netgroup| netgroup_users(netgroup.values("nisNetgroupTriple")).contains(&login))
            .map(Self::group_name)
            .collect())
    }
}

#[async_trait]
impl MemberResolver for PosixMembers {
    fn lookup(&self) -> &MemberLookup {
        &self.lookup
    }

    async fn find_user_groups(&self, login: &str) -> Result<Vec<String>> {
        self.lookup.find_user(login).await?;

        if self.lookup.config().use_netgroups {
            return Ok(dedup(self.netgroups_for_user(login).await?));
        }

        let groups = self
            .lookup
            .search(&self.lookup.config().group_base, &Filter::eq("memberUid", login))
            .await?;

        Ok(dedup(groups.iter().map(Self::group_name)))
    }

    async fn find_group_members(&self, gid: &str) -> Result<Vec<String>> {
        let netgroups = self.lookup.config().use_netgroups;
        let class_filter = self.group_class_filter();

        // (dn, reached through a member reference)
        let mut pending: VecDeque<(String, bool)> = self
            .lookup
            .find_group(gid)
            .await?
            .into_iter()
            .map(|group| (group.dn, false))
            .collect();
        let mut visited = HashSet::new();
        let mut members = Vec::new();

        while let Some((dn, referenced)) = pending.pop_front() {
            if !visited.insert(dn.to_lowercase()) {
                debug!("Group {} already traversed", dn);
                continue;
            }

            let entries = self.lookup.search(&dn, &class_filter).await?;
            if entries.is_empty() && referenced {
                members.push(self.member_login(&dn).await?);
                continue;
            }

            for entry in &entries {
                // the subtree search already covered everything below it
                visited.insert(entry.dn.to_lowercase());

                if netgroups {
                    members.extend(netgroup_users(entry.values("nisNetgroupTriple")));

                    for nested in entry.values("memberNisNetgroup") {
                        match self.lookup.find_group(nested).await {
                            Ok(groups) => pending.extend(groups.into_iter().map(|g| (g.dn, false))),
                            Err(Error::GroupNotFound(_)) => {
                                debug!("Nested netgroup {} does not exist", nested)
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    continue;
                }

                members.extend(entry.values("memberUid").iter().map(|uid| canonical(uid)));

                for attr in ["member", "uniqueMember"] {
                    for member in entry.values(attr) {
                        if self.is_user_dn(member) {
                            members.push(self.lookup.normalizer().extract_login(member));
                        } else {
                            pending.push_back((member.clone(), true));
                        }
                    }
                }
            }
        }

        Ok(dedup(members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::member::tests::{config, lookup};
    use crate::ldap::testing::MockTransport;
    use dirmember_core::ServerType;
    use std::sync::Arc;

    const GROUP_BASE: &str = "ou=groups,dc=example,dc=com";

    fn posix(mock: MockTransport, use_netgroups: bool) -> (Arc<MockTransport>, PosixMembers) {
        let mut config = config(ServerType::Posix);
        config.use_netgroups = use_netgroups;
        let (mock, lookup) = lookup(mock, config);
        (mock, PosixMembers::new(lookup))
    }

    fn groups_filter() -> Filter {
        Filter::class("posixGroup")
            | Filter::class("organizationalUnit")
            | Filter::class("groupOfUniqueNames")
            | Filter::class("groupOfNames")
    }

    fn with_user(mock: MockTransport) -> MockTransport {
        mock.expect_search(
            "dc=example,dc=com",
            &Filter::eq("uid", "john"),
            vec![DirectoryEntry::new("uid=john,ou=users,dc=example,dc=com")],
        )
    }

    #[tokio::test]
    async fn test_find_user_groups() {
        let group = DirectoryEntry::new("cn=broze,ou=groups,dc=example,dc=com")
            .with("cn", ["broze"])
            .with("memberUid", ["john"]);
        let mock = with_user(MockTransport::new()).expect_search(
            GROUP_BASE,
            &Filter::eq("memberUid", "john"),
            vec![group],
        );
        let (_, service) = posix(mock, false);

        assert_eq!(service.find_user_groups("john").await.unwrap(), ["broze"]);
    }

    #[tokio::test]
    async fn test_find_no_groups() {
        let (_, service) = posix(with_user(MockTransport::new()), false);

        assert!(service.find_user_groups("john").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_groups_for_missing_user() {
        let (_, service) = posix(MockTransport::new(), false);

        assert!(matches!(
            service.find_user_groups("john").await,
            Err(Error::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_netgroups_for_user() {
        let admins = DirectoryEntry::new("cn=admins,ou=groups,dc=example,dc=com")
            .with("cn", ["admins"])
            .with("nisNetgroupTriple", ["(host1,John,example)", "(host1,bob,example)"]);
        let others = DirectoryEntry::new("cn=others,ou=groups,dc=example,dc=com")
            .with("cn", ["others"])
            .with("nisNetgroupTriple", ["(host1,alice,example)"]);
        let mock = with_user(MockTransport::new()).expect_search(
            GROUP_BASE,
            &Filter::class("nisNetgroup"),
            vec![admins, others],
        );
        let (_, service) = posix(mock, true);

        assert_eq!(service.find_user_groups("john").await.unwrap(), ["admins"]);
    }

    #[tokio::test]
    async fn test_find_users_in_nested_groups() {
        let group = DirectoryEntry::new("CN=foremaners,DC=example,DC=com").with("memberUid", ["katellers"]);
        let nested = DirectoryEntry::new("CN=katellers,CN=foremaners,DC=example,DC=com")
            .with("memberUid", ["testuser"]);
        let mock = MockTransport::new()
            .expect_search(GROUP_BASE, &Filter::eq("cn", "foremaners"), vec![group.clone()])
            .expect_search(&group.dn, &groups_filter(), vec![nested]);
        let (mock, service) = posix(mock, false);

        assert_eq!(service.find_group_members("foremaners").await.unwrap(), ["testuser"]);
        // one group lookup, one subtree search
        assert_eq!(mock.search_count(), 2);
    }

    #[tokio::test]
    async fn test_group_subtree_members_are_deduplicated() {
        let group = DirectoryEntry::new("cn=a,ou=groups,dc=example,dc=com").with("memberUid", ["x", "Y"]);
        let nested = DirectoryEntry::new("cn=b,cn=a,ou=groups,dc=example,dc=com").with("memberUid", ["y", "z"]);
        let mock = MockTransport::new()
            .expect_search(GROUP_BASE, &Filter::eq("cn", "a"), vec![group.clone()])
            .expect_search(&group.dn, &groups_filter(), vec![group.clone(), nested]);
        let (_, service) = posix(mock, false);

        assert_eq!(service.find_group_members("a").await.unwrap(), ["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_member_references_are_followed_once() {
        let a_dn = "cn=a,ou=groups,dc=example,dc=com";
        let b_dn = "cn=b,ou=groups,dc=example,dc=com";
        let a = DirectoryEntry::new(a_dn)
            .with("member", [b_dn, "uid=Alice,ou=users,dc=example,dc=com"]);
        // b points back at a
        let b = DirectoryEntry::new(b_dn)
            .with("member", [a_dn])
            .with("memberUid", ["bob"]);
        let mock = MockTransport::new()
            .expect_search(GROUP_BASE, &Filter::eq("cn", "a"), vec![a.clone()])
            .expect_search(a_dn, &groups_filter(), vec![a])
            .expect_search(b_dn, &groups_filter(), vec![b]);
        let (mock, service) = posix(mock, false);

        assert_eq!(service.find_group_members("a").await.unwrap(), ["alice", "bob"]);
        assert_eq!(mock.search_count(), 3);
    }

    #[tokio::test]
    async fn test_members_named_by_cn() {
        let staff = DirectoryEntry::new("cn=staff,ou=groups,dc=example,dc=com").with(
            "member",
            [
                "cn=Jane Doe,ou=people,dc=example,dc=com",
                "uid=john,ou=people,dc=example,dc=com",
                "cn=Ghost,ou=people,dc=example,dc=com",
            ],
        );
        let jane = DirectoryEntry::new("cn=Jane Doe,ou=people,dc=example,dc=com").with("uid", ["jdoe"]);
        let mock = MockTransport::new()
            .expect_search(GROUP_BASE, &Filter::eq("cn", "staff"), vec![staff.clone()])
            .expect_search(&staff.dn.clone(), &groups_filter(), vec![staff])
            .expect_search(
                "ou=people,dc=example,dc=com",
                &Filter::eq("cn", "Jane Doe"),
                vec![jane],
            );
        let (_, service) = posix(mock, false);

        // jane resolves through her entry, ghost has none and keeps the DN value
        assert_eq!(
            service.find_group_members("staff").await.unwrap(),
            ["john", "jdoe", "ghost"]
        );
    }

    #[tokio::test]
    async fn test_empty_group_has_no_members() {
        let group = DirectoryEntry::new("cn=empty,ou=groups,dc=example,dc=com");
        let mock = MockTransport::new().expect_search(GROUP_BASE, &Filter::eq("cn", "empty"), vec![group]);
        let (mock, service) = posix(mock, false);

        assert!(service.find_group_members("empty").await.unwrap().is_empty());
        // the group itself is never looked up as a user
        assert_eq!(mock.search_count(), 2);
    }

    #[tokio::test]
    async fn test_nested_netgroups() {
        let outer = DirectoryEntry::new("cn=outer,ou=groups,dc=example,dc=com")
            .with("nisNetgroupTriple", ["(,alice,)"])
            .with("memberNisNetgroup", ["inner"]);
        let inner = DirectoryEntry::new("cn=inner,ou=groups,dc=example,dc=com")
            .with("nisNetgroupTriple", ["(,bob,)"])
            .with("memberNisNetgroup", ["outer"]);
        let netgroup = Filter::class("nisNetgroup");
        let mock = MockTransport::new()
            .expect_search(GROUP_BASE, &Filter::eq("cn", "outer"), vec![outer.clone()])
            .expect_search(GROUP_BASE, &Filter::eq("cn", "inner"), vec![inner.clone()])
            .expect_search(&outer.dn, &netgroup, vec![outer.clone()])
            .expect_search(&inner.dn, &netgroup, vec![inner.clone()]);
        let (_, service) = posix(mock, true);

        assert_eq!(service.find_group_members("outer").await.unwrap(), ["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_missing_group() {
        let (_, service) = posix(MockTransport::new(), false);

        assert!(matches!(
            service.find_group_members("broze").await,
            Err(Error::GroupNotFound(_))
        ));
    }
}
