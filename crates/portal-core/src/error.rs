//! Error types for the Portal client core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message surfaced when a request could not reach the server.
pub const CONNECTION_FAILURE_MESSAGE: &str = "Could not connect to the server. Please try again.";

/// A shared error type for the entire Portal client core.
///
/// The first five variants form the outcome taxonomy every operation reports
/// to its caller. The remaining variants come from the storage and
/// configuration layers.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortalError {
    /// Local, pre-network validation failure (no request was made).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation requires an authenticated session.
    ///
    /// This is an expected control-flow signal: the caller renders an
    /// authentication prompt.
    #[error("Authentication required")]
    AuthRequired,

    /// The server answered with a non-success status.
    #[error("Server rejected request: {message}")]
    ServerRejected {
        status: Option<u16>,
        message: String,
    },

    /// The request could not complete (transport failure or timeout).
    #[error("Connection error: {0}")]
    Connection(String),

    /// A refresh failed but previously loaded data is still available.
    #[error("Showing previously loaded data: {0}")]
    StaleData(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Credential storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a ServerRejected error
    pub fn rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ServerRejected {
            status,
            message: message.into(),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a StaleData warning
    pub fn stale(message: impl Into<String>) -> Self {
        Self::StaleData(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }

    pub fn is_server_rejected(&self) -> bool {
        matches!(self, Self::ServerRejected { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn is_stale_data(&self) -> bool {
        matches!(self, Self::StaleData(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the text shown to the user for this failure.
    ///
    /// Server messages are surfaced verbatim; transport failures collapse to a
    /// single retry-suggesting message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::StaleData(message) => message.clone(),
            Self::AuthRequired => "Please sign in to continue".to_string(),
            Self::ServerRejected { message, .. } => message.clone(),
            Self::Connection(_) => CONNECTION_FAILURE_MESSAGE.to_string(),
            Self::NotFound { entity_type, .. } => format!("This {} is no longer available", entity_type),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PortalError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PortalError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (bootstrap glue only)
impl From<anyhow::Error> for PortalError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, PortalError>`.
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_message_is_generic() {
        let err = PortalError::connection("tcp connect error: refused");
        assert!(err.is_connection());
        assert_eq!(err.user_message(), CONNECTION_FAILURE_MESSAGE);
    }

    #[test]
    fn test_server_message_is_surfaced() {
        let err = PortalError::rejected(Some(401), "Invalid credentials");
        assert!(err.is_server_rejected());
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PortalError = io.into();
        assert!(matches!(err, PortalError::Storage(_)));
    }
}
