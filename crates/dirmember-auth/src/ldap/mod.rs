//! LDAP group membership resolution
//!
//! Resolves users, groups and memberships against:
//! - Generic LDAP directories (`member` / `memberOf`)
//! - POSIX directories (`memberUid`, nested groups, NIS netgroups)
//! - FreeIPA
//!
//! Features:
//! - Canonical, lower-cased login and group names
//! - Nested group traversal with cycle protection
//! - Password checks through simple bind

mod client;
mod entry;
mod filter;
mod member;
pub mod normalize;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::LdapClient;
pub use entry::DirectoryEntry;
pub use filter::Filter;
pub use member::{
    FreeIpaMembers, GenericMembers, MemberLookup, MemberResolver, MemberService, PosixMembers,
};
pub use transport::{LdapTransport, Transport};
pub use types::*;
