//! LDAP search filter expressions
//!
//! A small filter AST rendered to RFC 4515 text for the transport. Values
//! are escaped on rendering, so callers pass raw logins and group names.

use dirmember_core::{Error, Result};
use ldap3::ldap_escape;
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Search filter node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(attr=value)`
    Eq { attr: String, value: String },
    /// `(attr=*)`
    Present(String),
    /// `(&...)`
    And(Vec<Filter>),
    /// `(|...)`
    Or(Vec<Filter>),
    /// Pre-validated filter text, rendered as is
    Raw(String),
}

impl Filter {
    pub fn eq(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            attr: attr.into(),
            value: value.into(),
        }
    }

    pub fn present(attr: impl Into<String>) -> Self {
        Filter::Present(attr.into())
    }

    /// `(objectClass=name)`
    pub fn class(name: impl Into<String>) -> Self {
        Filter::eq("objectClass", name)
    }

    /// OR of several object classes, for schemas where the exact group
    /// class is not known up front
    pub fn any_class<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Or(names.into_iter().map(Filter::class).collect())
    }

    /// Parse and validate a filter string.
    ///
    /// A bare `attr=value` is accepted and wrapped in parentheses.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::MalformedFilter("empty filter".into()));
        }

        let text = if text.starts_with('(') {
            text.to_string()
        } else {
            format!("({})", text)
        };

        ldap3::parse_filter(&text)
            .map_err(|_| Error::MalformedFilter(text.clone()))?;

        Ok(Filter::Raw(text))
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        match self {
            Filter::And(mut items) => {
                items.push(rhs);
                Filter::And(items)
            }
            lhs => Filter::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        match self {
            Filter::Or(mut items) => {
                items.push(rhs);
                Filter::Or(items)
            }
            lhs => Filter::Or(vec![lhs, rhs]),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq { attr, value } => write!(f, "({}={})", attr, ldap_escape(value.as_str())),
            Filter::Present(attr) => write!(f, "({}=*)", attr),
            Filter::And(items) => {
                f.write_str("(&")?;
                for item in items {
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Filter::Or(items) => {
                f.write_str("(|")?;
                for item in items {
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Filter::Raw(text) => f.write_str(text),
        }
    }
}
