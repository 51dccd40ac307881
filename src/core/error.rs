use std::fmt;

/// Comprehensive error types for urlprobe operations.
///
/// Only request-level problems and storage failures surface as errors. A URL
/// that cannot be reached or fails classification is reported through
/// `ValidationResult`, never through this type.
#[derive(Debug)]
pub enum UrlProbeError {
    /// IO error (cache documents, config files)
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Invalid argument or request option
    InvalidArgument(String),

    /// Batch contained no URLs
    EmptyBatch,

    /// Batch exceeded the configured maximum
    BatchTooLarge { size: usize, max: usize },

    /// HTTP client construction error
    Http(reqwest::Error),

    /// Regex compilation error
    Regex(regex::Error),

    /// TOML parsing error
    TomlParsing(toml::de::Error),

    /// JSON (de)serialization error
    Serialization(serde_json::Error),

    /// Cache storage error
    Storage(String),

    /// Durable dataset does not exist
    ProjectNotFound(String),
}

impl fmt::Display for UrlProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlProbeError::Io(err) => write!(f, "IO error: {err}"),
            UrlProbeError::Config(msg) => write!(f, "Configuration error: {msg}"),
            UrlProbeError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            UrlProbeError::EmptyBatch => write!(f, "Invalid batch: no URLs provided"),
            UrlProbeError::BatchTooLarge { size, max } => {
                write!(f, "Invalid batch: {size} URLs exceeds the maximum of {max}")
            }
            UrlProbeError::Http(err) => write!(f, "HTTP error: {err}"),
            UrlProbeError::Regex(err) => write!(f, "Regex error: {err}"),
            UrlProbeError::TomlParsing(err) => write!(f, "TOML parsing error: {err}"),
            UrlProbeError::Serialization(err) => write!(f, "Serialization error: {err}"),
            UrlProbeError::Storage(msg) => write!(f, "Storage error: {msg}"),
            UrlProbeError::ProjectNotFound(name) => write!(f, "Project not found: {name}"),
        }
    }
}

impl std::error::Error for UrlProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UrlProbeError::Io(err) => Some(err),
            UrlProbeError::Http(err) => Some(err),
            UrlProbeError::Regex(err) => Some(err),
            UrlProbeError::TomlParsing(err) => Some(err),
            UrlProbeError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for UrlProbeError {
    fn from(err: std::io::Error) -> Self {
        UrlProbeError::Io(err)
    }
}

impl From<reqwest::Error> for UrlProbeError {
    fn from(err: reqwest::Error) -> Self {
        UrlProbeError::Http(err)
    }
}

impl From<regex::Error> for UrlProbeError {
    fn from(err: regex::Error) -> Self {
        UrlProbeError::Regex(err)
    }
}

impl From<toml::de::Error> for UrlProbeError {
    fn from(err: toml::de::Error) -> Self {
        UrlProbeError::TomlParsing(err)
    }
}

impl From<serde_json::Error> for UrlProbeError {
    fn from(err: serde_json::Error) -> Self {
        UrlProbeError::Serialization(err)
    }
}

/// Type alias for Results using UrlProbeError
pub type Result<T> = std::result::Result<T, UrlProbeError>;
