//! Configuration for dirmember

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirmemberConfig {
    #[serde(default)]
    pub directory: DirectoryConfigSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DirmemberConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        let directory = &mut config.directory;

        if let Ok(url) = std::env::var("DIRMEMBER_SERVER_URL") {
            directory.server_url = url;
        }
        if let Ok(server_type) = std::env::var("DIRMEMBER_SERVER_TYPE") {
            if let Ok(t) = server_type.parse() {
                directory.server_type = t;
            }
        }
        if let Ok(base) = std::env::var("DIRMEMBER_BASE_DN") {
            directory.base_dn = base;
        }
        if let Ok(base) = std::env::var("DIRMEMBER_GROUP_BASE") {
            directory.group_base = Some(base);
        }
        if let Ok(attr) = std::env::var("DIRMEMBER_ATTR_LOGIN") {
            directory.attr_login = Some(attr);
        }
        if let Ok(format) = std::env::var("DIRMEMBER_BIND_DN_FORMAT") {
            directory.bind_dn_format = Some(format);
        }
        if let Ok(filter) = std::env::var("DIRMEMBER_SEARCH_FILTER") {
            directory.search_filter = Some(filter);
        }
        if let Ok(user) = std::env::var("DIRMEMBER_SERVICE_USER") {
            directory.service_user = Some(user);
        }
        if let Ok(pass) = std::env::var("DIRMEMBER_SERVICE_PASS") {
            directory.service_pass = Some(pass);
        }
        if let Ok(timeout) = std::env::var("DIRMEMBER_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                directory.timeout_seconds = t;
            }
        }
        if env_flag("DIRMEMBER_USE_NETGROUPS") {
            directory.use_netgroups = true;
        }
        if env_flag("DIRMEMBER_ANON_QUERIES") {
            directory.anon_queries = true;
        }
        if env_flag("DIRMEMBER_START_TLS") {
            directory.start_tls = true;
        }

        if let Ok(level) = std::env::var("DIRMEMBER_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("DIRMEMBER_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "true").unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Directory flavor, decides how group membership is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    /// Explicit `member` / `memberOf` lists
    #[default]
    Generic,
    /// `posixGroup` with `memberUid`, nested OUs, NIS netgroups
    Posix,
    /// FreeIPA `memberOf` with `ipaUniqueID` references
    FreeIpa,
}

impl FromStr for ServerType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "ldap" => Ok(ServerType::Generic),
            "posix" => Ok(ServerType::Posix),
            "free_ipa" | "freeipa" | "ipa" => Ok(ServerType::FreeIpa),
            other => Err(crate::Error::Config(format!("Unknown server type: {}", other))),
        }
    }
}

/// Directory connection and schema section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfigSection {
    /// LDAP server URL (ldap://, ldaps:// or ldapi://)
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Use STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Directory flavor: generic, posix, free_ipa
    #[serde(default)]
    pub server_type: ServerType,

    /// Base DN for user searches
    #[serde(default)]
    pub base_dn: String,

    /// Base DN for group searches, `base_dn` when unset
    #[serde(default)]
    pub group_base: Option<String>,

    /// Login attribute, `uid` when unset
    #[serde(default)]
    pub attr_login: Option<String>,

    /// Template for user bind DNs (use {login} placeholder)
    /// Example: "uid={login},ou=users,dc=example,dc=com"
    #[serde(default)]
    pub bind_dn_format: Option<String>,

    /// Groups are NIS netgroups (POSIX only)
    #[serde(default)]
    pub use_netgroups: bool,

    /// Extra filter AND-ed into every user search
    /// Example: "(objectClass=inetOrgPerson)"
    #[serde(default)]
    pub search_filter: Option<String>,

    /// Service account used for lookups
    #[serde(default)]
    pub service_user: Option<String>,

    /// Service account password
    #[serde(default)]
    pub service_pass: Option<String>,

    /// Run lookups without binding as the service account
    #[serde(default)]
    pub anon_queries: bool,
}

fn default_server_url() -> String {
    "ldap://localhost:389".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for DirectoryConfigSection {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            start_tls: false,
            skip_tls_verify: false,
            timeout_seconds: default_timeout(),
            server_type: ServerType::default(),
            base_dn: String::new(),
            group_base: None,
            attr_login: None,
            bind_dn_format: None,
            use_netgroups: false,
            search_filter: None,
            service_user: None,
            service_pass: None,
            anon_queries: false,
        }
    }
}

impl DirectoryConfigSection {
    pub fn validate(&self) -> crate::Result<()> {
        if self.server_url.is_empty() {
            return Err(crate::Error::Config("Server URL is required".into()));
        }

        if !["ldap://", "ldaps://", "ldapi://"]
            .iter()
            .any(|scheme| self.server_url.starts_with(scheme))
        {
            return Err(crate::Error::Config(
                "Server URL must start with ldap://, ldaps:// or ldapi://".into(),
            ));
        }

        if self.base_dn.is_empty() {
            return Err(crate::Error::Config("Base DN is required".into()));
        }

        if let Some(ref format) = self.bind_dn_format {
            if !format.contains("{login}") {
                return Err(crate::Error::Config(
                    "Bind DN format must contain {login} placeholder".into(),
                ));
            }
        }

        if self.service_user.is_some() && self.service_pass.is_none() && !self.anon_queries {
            return Err(crate::Error::Config(
                "Service user configured without a service password".into(),
            ));
        }

        Ok(())
    }
}
