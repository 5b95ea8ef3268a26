//! Error types and handling for Vatio
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Vatio operations
pub type Result<T> = std::result::Result<T, VatioError>;

/// Main error type for Vatio
#[derive(Debug, Error)]
pub enum VatioError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport, protocol, timeout, or response-decoding failures from the
    /// upstream price API; retries have already been exhausted per policy
    #[error("Fetch error: {message}")]
    Fetch { message: String },

    /// Malformed payload structure while building price series
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl VatioError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        VatioError::Config {
            message: message.into(),
        }
    }

    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        VatioError::Fetch {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        VatioError::Parse {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        VatioError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        VatioError::Io {
            message: message.into(),
        }
    }

    /// True for the failures a refresh surfaces to the user as a notice
    /// rather than a crash
    pub fn is_refresh_failure(&self) -> bool {
        matches!(self, VatioError::Fetch { .. } | VatioError::Parse { .. })
    }
}

impl From<std::io::Error> for VatioError {
    fn from(err: std::io::Error) -> Self {
        VatioError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for VatioError {
    fn from(err: serde_yaml::Error) -> Self {
        VatioError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for VatioError {
    fn from(err: reqwest::Error) -> Self {
        VatioError::fetch(err.to_string())
    }
}

impl From<chrono::ParseError> for VatioError {
    fn from(err: chrono::ParseError) -> Self {
        VatioError::parse(format!("invalid datetime: {}", err))
    }
}
