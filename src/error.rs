//! Error types for the plugin runtime

use thiserror::Error;

/// Result type alias for plugin runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching, loading, registering or gating plugins
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Descriptor list unreachable or answered with a non-success status
    #[error("plugin descriptor fetch failed: {0}")]
    Fetch(String),

    /// A bundle could not be fetched or failed to execute
    #[error("bundle load failed: {0}")]
    Load(String),

    /// A registration was rejected or could not reach the host
    #[error("registration error: {0}")]
    Registration(String),

    /// A capability check could not complete
    #[error("capability check failed: {0}")]
    Capability(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
