//! Error types for sfs-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for sfs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sfs-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Keyring or endpoint resolution failure
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Path, container or local file absent
    #[error("{0}: No such file or directory")]
    NotFound(String),

    /// Operation requested on a path kind it cannot handle
    #[error("{0}: Unsupported path type")]
    UnsupportedPathKind(String),

    /// Destination path has no container component
    #[error("You must specify a container")]
    MissingContainerSpecifier,

    /// Operation the tool deliberately does not implement
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Unexpected status code or network failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store refused a request that clashes with its current state,
    /// e.g. deleting a container that still holds objects
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store reported existence with headers matching no known kind
    #[error("{0}: Unable to determine path type")]
    ClassificationAmbiguous(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,               // UsageError
            Error::Config(_) => 2,                    // UsageError
            Error::MissingContainerSpecifier => 2,    // UsageError
            Error::Transport(_) => 3,                 // NetworkError
            Error::Auth(_) => 4,                      // AuthError
            Error::NotFound(_) => 5,                  // NotFound
            Error::Conflict(_) => 6,                  // Conflict
            Error::UnsupportedPathKind(_) => 7,       // UnsupportedFeature
            Error::UnsupportedOperation(_) => 7,      // UnsupportedFeature
            _ => 1,                                   // GeneralError
        }
    }
}
