//! dirmember Core Library
//!
//! Error types and configuration shared by the dirmember crates.

pub mod config;
pub mod error;

pub use config::{DirectoryConfigSection, DirmemberConfig, LoggingConfig, ServerType};
pub use error::{Error, Result};

/// dirmember version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
