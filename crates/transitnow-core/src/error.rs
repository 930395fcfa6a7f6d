//! Core error types for transitnow-core.
//!
//! Every fallible operation in the library returns [`CoreError`] (through the
//! [`Result`] alias) or one of the focused error enums it wraps.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for transitnow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Catalog ingestion errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid time range (Julian dates)
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange { start: f64, end: f64 },

    /// Calendar field outside its valid range
    #[error("Calendar field '{field}' out of range: {value}")]
    CalendarOutOfRange { field: &'static str, value: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Catalog and reference-table errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The file had no header row
    #[error("catalog is empty")]
    Empty,

    /// A required column is absent from the header
    #[error("catalog is missing required column '{0}'")]
    MissingColumn(String),

    /// Download failed with a non-success HTTP status
    #[error("download of {url} failed with HTTP {status}")]
    Download { url: String, status: u16 },

    /// Constellation boundary table line could not be parsed
    #[error("boundary table line {line}: {message}")]
    BoundaryParse { line: usize, message: String },

    /// No constellation matched a position
    #[error("no constellation found for {0}")]
    Unresolved(String),
}

/// Errors raised while posting a message.
#[derive(Error, Debug)]
#[error("{transport} failed to post: {message}")]
pub struct TransportError {
    pub transport: String,
    pub message: String,
    /// Whether another attempt may succeed.
    pub retriable: bool,
}

impl TransportError {
    pub fn retriable(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            message: message.into(),
            retriable: true,
        }
    }

    pub fn permanent(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            message: message.into(),
            retriable: false,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
