//! Error types for the local storage library
//!
//! This module provides a unified error handling system using `thiserror`.
//! Store backends and the JSON adapter report [`StorageError`]; configuration
//! loading and other crate-level entry points report [`Error`].

use thiserror::Error;

/// The main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Storage operation errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// JSON errors outside of stored values (configuration documents)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store rejected the support probe. Carries the underlying cause and
    /// a remediation hint suitable for showing to a user.
    #[error("Storage is not supported: {source}. {hint}")]
    Unsupported {
        /// Human-readable remediation hint
        hint: String,
        /// The failure reported by the store during the probe
        #[source]
        source: Box<StorageError>,
    },

    /// Storage operation failed
    #[error("Storage operation failed: {operation}: {reason}")]
    OperationFailed {
        /// Operation that failed
        operation: String,
        /// Failure description
        reason: String,
    },

    /// Permission denied
    #[error("Permission denied: {resource}")]
    PermissionDenied {
        /// Resource the write or read was refused for
        resource: String,
    },

    /// Storage quota exceeded
    #[error("Storage quota exceeded writing {key}: {requested} bytes requested, quota is {quota} bytes")]
    QuotaExceeded {
        /// Key whose write was rejected
        key: String,
        /// Total bytes the store would hold after the write
        requested: usize,
        /// Configured quota in bytes
        quota: usize,
    },

    /// Stored value could not be decoded
    #[error("Failed to decode value for {key}: {reason}")]
    DecodeFailed {
        /// Key holding the undecodable value
        key: String,
        /// Decoder message
        reason: String,
    },

    /// Value could not be encoded as JSON
    #[error("Failed to encode value for {key}: {reason}")]
    EncodeFailed {
        /// Key the value was meant for
        key: String,
        /// Encoder message
        reason: String,
    },

    /// Key rejected by validation
    #[error("Invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

impl StorageError {
    /// Build an [`StorageError::OperationFailed`] from anything displayable
    pub(crate) fn operation(operation: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::OperationFailed {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The remediation hint, if this error came from a failed support probe
    pub fn hint(&self) -> Option<&str> {
        match self {
            StorageError::Unsupported { hint, .. } => Some(hint.as_str()),
            _ => None,
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience type alias for Storage Results
pub type StorageResult<T> = std::result::Result<T, StorageError>;
