//! Canonical login and group names
//!
//! Membership attributes come back as full DNs (`uid=john,ou=users,...`),
//! bare names (`john`), NIS triples (`(host,john,domain)`) and in whatever
//! case the server happened to store. Everything is reduced to a lower-cased
//! identifier so the same identity never shows up twice.

use crate::ldap::entry::DirectoryEntry;
use std::collections::HashSet;

/// Naming attribute of group entries
pub const GROUP_NAME_ATTRIBUTE: &str = "cn";

/// Ordered login-attribute probe list with first-match-wins extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    login_attributes: Vec<String>,
}

impl Normalizer {
    /// Probe order is the schema login attribute, then `uid`, then `cn`.
    pub fn new(attr_login: &str) -> Self {
        let mut login_attributes: Vec<String> = Vec::new();
        for attr in [attr_login, "uid", "cn"] {
            if !login_attributes.iter().any(|a| a.eq_ignore_ascii_case(attr)) {
                login_attributes.push(attr.to_string());
            }
        }
        Self { login_attributes }
    }

    pub fn login_attributes(&self) -> &[String] {
        &self.login_attributes
    }

    /// Canonical login from a DN or bare value
    pub fn extract_login(&self, raw: &str) -> String {
        extract_with(raw, &self.login_attributes)
    }

    /// Canonical login read off an entry's first present login attribute
    pub fn login_from_entry(&self, entry: &DirectoryEntry) -> Option<String> {
        self.login_attributes
            .iter()
            .find_map(|attr| entry.first(attr))
            .map(canonical)
    }
}

/// Canonical group name from a DN or bare value
pub fn extract_group_name(raw: &str) -> String {
    extract_with(raw, &[GROUP_NAME_ATTRIBUTE])
}

pub fn extract_group_names<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    dedup(raw.iter().map(|value| extract_group_name(value.as_ref())))
}

/// User component of a NIS netgroup triple `(host,user,domain)`
pub fn extract_netgroup_user(triple: &str) -> Option<String> {
    let inner = triple.trim().trim_start_matches('(').trim_end_matches(')');
    let user = inner.split(',').nth(1)?.trim();
    if user.is_empty() || user == "-" {
        return None;
    }
    Some(canonical(user))
}

pub fn netgroup_users<S: AsRef<str>>(triples: &[S]) -> Vec<String> {
    dedup(
        triples
            .iter()
            .filter_map(|triple| extract_netgroup_user(triple.as_ref())),
    )
}

/// Lower-cased, trimmed identifier
pub fn canonical(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Drops repeats, keeping first-seen order
pub fn dedup<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Whether the value parses as a DN (leading `attr=value` component)
pub fn looks_like_dn(value: &str) -> bool {
    split_rdn(value).is_some()
}

/// Splits off the leading RDN of a DN.
///
/// Returns the naming attribute, its unescaped value and the parent DN
/// (empty for a single-component DN).
pub fn split_rdn(dn: &str) -> Option<(String, String, String)> {
    let mut components = rdn_components(dn);
    let first = components.next()?;
    let (attr, value) = parse_component(first)?;
    let parent = dn[first.len()..].trim_start_matches(',').trim().to_string();
    Some((attr.to_string(), value, parent))
}

fn extract_with<S: AsRef<str>>(raw: &str, attributes: &[S]) -> String {
    // a value can itself read as `attr=value`; unwrap until it no longer does
    let mut value = raw.trim().to_string();
    while let Some(inner) = leading_value(&value, attributes) {
        value = inner;
    }
    canonical(&value)
}

/// Value of the leading `attr=value` component when `attr` is a candidate
fn leading_value<S: AsRef<str>>(value: &str, attributes: &[S]) -> Option<String> {
    let (attr, inner) = parse_component(rdn_components(value).next()?)?;
    attributes
        .iter()
        .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(attr))
        .then_some(inner)
}

/// Comma-separated components, honouring `\,` escapes
fn rdn_components(dn: &str) -> impl Iterator<Item = &str> {
    let mut rest = dn;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let mut escaped = false;
        let mut end = rest.len();
        for (i, c) in rest.char_indices() {
            match c {
                '\\' if !escaped => escaped = true,
                ',' if !escaped => {
                    end = i;
                    break;
                }
                _ => escaped = false,
            }
        }
        let component = &rest[..end];
        rest = rest.get(end + 1..).unwrap_or("");
        Some(component)
    })
}

fn parse_component(component: &str) -> Option<(&str, String)> {
    let (attr, value) = component.split_once('=')?;
    let attr = attr.trim();
    if attr.is_empty()
        || !attr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ';')
    {
        return None;
    }
    Some((attr, unescape_value(value.trim())))
}

/// Undoes RFC 4514 escaping: `\,` style pairs and `\2c` style hex pairs
fn unescape_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            match hex {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(bytes[i + 1]);
                    i += 2;
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_name_from_dn() {
        assert_eq!(extract_group_name("cn=foo,ou=bar,dc=example,dc=com"), "foo");
        assert_eq!(
            extract_group_name("CN=Bros,OU=bropeeps,DC=jomara,DC=redhat,DC=com"),
            "bros"
        );
        assert_eq!(extract_group_name("broze"), "broze");
    }

    #[test]
    fn test_group_name_reads_leading_component_only() {
        assert_eq!(
            extract_group_name("ou=staff,cn=admins,dc=example"),
            "ou=staff,cn=admins,dc=example"
        );
        assert_eq!(
            Normalizer::new("uid").extract_login("fqdn=host1,cn=computers,dc=example"),
            "fqdn=host1,cn=computers,dc=example"
        );
    }

    #[test]
    fn test_login_probe_order() {
        let normalizer = Normalizer::new("sAMAccountName");
        assert_eq!(
            normalizer.login_attributes(),
            ["sAMAccountName".to_string(), "uid".to_string(), "cn".to_string()]
        );
        assert_eq!(normalizer.extract_login("uid=John,ou=users,dc=example"), "john");
        assert_eq!(normalizer.extract_login("cn=Jane Doe,ou=users,dc=example"), "jane doe");
        assert_eq!(normalizer.extract_login("JOHN"), "john");

        // no duplicate probe when the schema already uses uid
        assert_eq!(Normalizer::new("UID").login_attributes().len(), 2);
    }

    #[test]
    fn test_login_extraction_is_idempotent() {
        let normalizer = Normalizer::new("uid");
        for raw in [
            "uid=John,dc=example",
            "john",
            "Doe\\, Jane",
            "cn=a\\,b,dc=x",
            "uid=cn\\=x,dc=y",
        ] {
            let once = normalizer.extract_login(raw);
            assert_eq!(normalizer.extract_login(&once), once);
        }
        assert_eq!(normalizer.extract_login("uid=cn\\=x,dc=y"), "x");
    }

    #[test]
    fn test_escaped_commas() {
        let normalizer = Normalizer::new("uid");
        assert_eq!(
            normalizer.extract_login("cn=Doe\\, Jane,ou=users,dc=example"),
            "doe, jane"
        );
        assert_eq!(extract_group_name("cn=a\\2cb,dc=example"), "a,b");
    }

    #[test]
    fn test_login_from_entry_first_match_wins() {
        let normalizer = Normalizer::new("uid");
        let entry = DirectoryEntry::new("uid=john,dc=example")
            .with("cn", ["John Smith"])
            .with("uid", ["John"]);
        assert_eq!(normalizer.login_from_entry(&entry), Some("john".to_string()));

        let entry = DirectoryEntry::new("cn=service,dc=example").with("cn", ["Service"]);
        assert_eq!(normalizer.login_from_entry(&entry), Some("service".to_string()));

        assert_eq!(normalizer.login_from_entry(&DirectoryEntry::new("dc=example")), None);
    }

    #[test]
    fn test_netgroup_triples() {
        assert_eq!(extract_netgroup_user("(host,John,domain)"), Some("john".to_string()));
        assert_eq!(extract_netgroup_user("(,-,)"), None);
        assert_eq!(extract_netgroup_user("garbage"), None);
        assert_eq!(
            netgroup_users(&["(a,bob,d)", "(b,bob,d)", "(c,alice,d)"]),
            ["bob".to_string(), "alice".to_string()]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(extract_group_names(&none).is_empty());
        assert!(netgroup_users(&none).is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let names = extract_group_names(&["cn=b,dc=x", "cn=A,dc=x", "cn=B,dc=y"]);
        assert_eq!(names, ["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_split_rdn() {
        let (attr, value, parent) = split_rdn("uid=a\\,b,ou=users,dc=example").unwrap();
        assert_eq!(attr, "uid");
        assert_eq!(value, "a,b");
        assert_eq!(parent, "ou=users,dc=example");

        assert!(looks_like_dn("uid=internet,dn=example"));
        assert!(!looks_like_dn("internet"));
    }
}
