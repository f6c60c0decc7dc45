//! Directory identity and group membership for dirmember

pub mod ldap;

pub use ldap::{
    DirectoryEntry, Filter, LdapClient, LdapTransport, MemberResolver, MemberService,
    SchemaConfig, Transport,
};
