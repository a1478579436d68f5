//! Error types and handling for Night Charger
//!
//! The planning engine itself never fails on numeric input: out-of-range
//! values are clamped or defaulted. These errors cover the surfaces that can
//! genuinely be misused: configuration files, persisted snapshots, explicit
//! precondition checks, and the charge session lifecycle.

use thiserror::Error;

/// Result type alias for Night Charger operations
pub type Result<T> = std::result::Result<T, NightChargerError>;

/// Main error type for Night Charger
#[derive(Debug, Error)]
pub enum NightChargerError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Charge session lifecycle errors
    #[error("Session error: {message}")]
    Session { message: String },
}

impl NightChargerError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new session error
    pub fn session<S: Into<String>>(message: S) -> Self {
        Self::Session {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for NightChargerError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for NightChargerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for NightChargerError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for NightChargerError {
    fn from(err: chrono::ParseError) -> Self {
        Self::validation("time", err.to_string())
    }
}
