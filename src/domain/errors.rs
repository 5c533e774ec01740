//! Domain error types
//!
//! This module defines the error hierarchy for Hydrosync.
//! Errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Hydrosync error type
///
/// This is the primary error type used throughout the library. The export
/// entry point converts it to a boolean outcome after logging it.
#[derive(Debug, Error)]
pub enum HydroError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// SensorThings / FROST errors
    #[error("FROST error: {0}")]
    Frost(#[from] FrostError),

    /// Unit conversion errors
    #[error("Unit error: {0}")]
    Units(#[from] UnitError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Export process errors
    #[error("Export error: {0}")]
    Export(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Coordinate reference system errors
    #[error("Geo error: {0}")]
    Geo(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// SensorThings API errors
///
/// Errors that occur when talking to a FROST server. They don't expose
/// the HTTP client's own error types.
#[derive(Debug, Error)]
pub enum FrostError {
    /// Failed to reach the server
    #[error("Failed to connect to FROST server: {0}")]
    ConnectionFailed(String),

    /// Authentication failed (401/403)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Response could not be interpreted
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl FrostError {
    /// Whether retrying the request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FrostError::ConnectionFailed(_)
                | FrostError::ServerError { .. }
                | FrostError::RateLimited(_)
                | FrostError::Timeout(_)
        )
    }
}

/// Unit conversion errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    /// The network declares a flow unit system that is not recognised
    #[error("Unknown unit system: {0}")]
    UnknownUnitSystem(String),

    /// The value (or its conversion) is NaN or infinite
    #[error("Non-finite value: {0}")]
    NonFiniteValue(f64),
}

impl HydroError {
    /// Whether the error is transient (worth retrying)
    pub fn is_transient(&self) -> bool {
        match self {
            HydroError::Frost(e) => e.is_transient(),
            HydroError::Connection(_) => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for HydroError {
    fn from(err: std::io::Error) -> Self {
        HydroError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HydroError {
    fn from(err: serde_json::Error) -> Self {
        HydroError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for HydroError {
    fn from(err: toml::de::Error) -> Self {
        HydroError::Configuration(format!("TOML parse error: {err}"))
    }
}
