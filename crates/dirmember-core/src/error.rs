//! Error types for dirmember

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Lookup Errors
    #[error("No directory entry found for user: {0}")]
    UserNotFound(String),

    #[error("No directory entry found for group: {0}")]
    GroupNotFound(String),

    // Input Errors
    #[error("Malformed search filter: {0}")]
    MalformedFilter(String),

    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    // Transport Errors
    #[error("Directory error: {0}")]
    Directory(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::UserNotFound(_) => "UserNotFound",
            Error::GroupNotFound(_) => "GroupNotFound",
            Error::MalformedFilter(_) => "MalformedFilter",
            Error::InvalidDn(_) => "InvalidDn",
            Error::Directory(_) => "DirectoryError",
            Error::Config(_) => "ConfigError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// Whether this is one of the recoverable "search returned nothing" kinds
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UserNotFound(_) | Error::GroupNotFound(_))
    }
}
