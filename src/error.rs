use std::fmt;
use thiserror::Error;

/// Device capabilities the field app depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Geolocation,
    Camera,
}

impl Capability {
    /// What the user can do to get the capability back.
    pub fn remediation(&self) -> &'static str {
        match self {
            Capability::Geolocation => "Allow location access for this device and try again",
            Capability::Camera => "Allow camera access or register the visit without a photo",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Geolocation => write!(f, "geolocation"),
            Capability::Camera => write!(f, "camera"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CrediarioError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not signed in")]
    Unauthorized,
    #[error("Session expired")]
    SessionExpired,
    #[error("{capability} unavailable: {reason}")]
    CapabilityError {
        capability: Capability,
        reason: String,
    },
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
}

impl CrediarioError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    /// Message safe to show to the person operating the app.
    ///
    /// Data-store failures collapse into one generic message; the detailed
    /// error is logged where it is raised.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(message) | Self::Conflict(message) => message.clone(),
            Self::NotFound { entity, .. } => format!("{entity} not found"),
            Self::Unauthorized => "Sign in to continue".to_string(),
            Self::SessionExpired => "Your session has expired, sign in again".to_string(),
            Self::CapabilityError { capability, reason } => {
                format!("{reason}. {}", capability.remediation())
            }
            _ => "Something went wrong while saving. Please try again.".to_string(),
        }
    }

    /// True for errors raised before any data was touched.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}

pub type Result<T> = std::result::Result<T, CrediarioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_generic_for_users() {
        let err = CrediarioError::internal("column family missing");
        assert!(!err.user_message().contains("column family"));
    }

    #[test]
    fn test_capability_message_carries_remediation() {
        let err = CrediarioError::CapabilityError {
            capability: Capability::Geolocation,
            reason: "Location permission denied".to_string(),
        };
        let message = err.user_message();
        assert!(message.starts_with("Location permission denied"));
        assert!(message.contains("Allow location access"));
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = CrediarioError::validation("Name is required");
        assert_eq!(err.user_message(), "Name is required");
        assert!(err.is_validation());
    }
}
