//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or the signal specification.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly named file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// No enabled format feature handles this file extension.
    #[error("No enabled configuration format reads '.{0}' files")]
    UnsupportedFormat(String),

    /// A source exists but does not fit the expected schema.
    #[error("Malformed {origin}: {source}")]
    Malformed {
        /// What was being read, e.g. the configuration or a specification path.
        origin: String,
        #[source]
        source: figment::Error,
    },

    /// A required value is empty.
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// A value is present but out of range or inconsistent.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn malformed(origin: impl Into<String>, source: figment::Error) -> Self {
        Self::Malformed {
            origin: origin.into(),
            source,
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The configuration field an error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField(field) | Self::Invalid { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
