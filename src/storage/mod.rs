//! Storage module for data persistence
//!
//! This module provides a JSON-aware storage layer over pluggable string
//! key-value backends:
//! - **Memory storage** - Process-local entries, shareable between clones
//! - **Local filesystem storage** - One JSON file per store, written atomically
//!
//! Backends implement [`StorageAdapter`]; [`JsonStorage`] wraps any of them
//! and adds the support probe, JSON encoding and prefix cleanup.
//!
//! # Examples
//!
//! ## Local Storage
//!
//! ```rust
//! use local_storage_rust::storage::{JsonStorage, LocalConfig, LocalStorage, Lookup};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let dir = tempfile::tempdir()?;
//! let local_config = LocalConfig {
//!     base_path: dir.path().to_path_buf(),
//!     ..Default::default()
//! };
//! let storage = JsonStorage::new(LocalStorage::new(local_config)?);
//!
//! // Store data
//! storage.set("session:current", &json!({"user": "admin"}))?;
//!
//! // Retrieve data
//! let lookup = storage.get("session:current")?;
//! assert_eq!(lookup, Lookup::Present(json!({"user": "admin"})));
//!
//! // Delete data
//! storage.remove("session:current")?;
//! assert!(storage.get("session:current")?.is_absent());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod memory_adapter;
pub mod storage_api;
pub mod storage_local;

pub use adapter::StorageAdapter;
pub use memory_adapter::MemoryAdapter;
pub use storage_api::{JsonStorage, Lookup, StorageConfig};
pub use storage_local::{LocalConfig, LocalStorage};

pub use crate::error::{StorageError, StorageResult};

/// Storage constants
pub mod constants {
    //! Constants used throughout the storage module

    /// Maximum length in bytes of a configured probe key
    pub const MAX_KEY_LENGTH: usize = 1024;

    /// Default byte quota for file-backed stores (5 MiB)
    pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

    /// Key written and removed by the support probe
    pub const DEFAULT_PROBE_KEY: &str = "__storage__test";

    /// Hint attached to a failed support probe
    pub const DEFAULT_UNSUPPORTED_HINT: &str =
        "This is likely due to your browser's cookie settings.";

    /// Separator used by [`namespaced_key`](super::utils::namespaced_key)
    pub const NAMESPACE_SEPARATOR: char = ':';
}

/// Storage factory for creating storage instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create an in-memory storage instance
    pub fn create_memory() -> MemoryAdapter {
        MemoryAdapter::new()
    }

    /// Create a local storage instance
    pub fn create_local(local_config: LocalConfig) -> StorageResult<LocalStorage> {
        LocalStorage::new(local_config)
    }

    /// Create storage from URL (convenience method)
    ///
    /// Accepts `memory://`, `file://<dir>`, and bare absolute or `./` relative
    /// directory paths.
    pub fn from_url(url: &str) -> StorageResult<Box<dyn StorageAdapter + Send + Sync>> {
        if url == "memory://" {
            return Ok(Box::new(Self::create_memory()));
        }

        let path = if let Some(path) = url.strip_prefix("file://") {
            path
        } else if url.starts_with("./") || url.starts_with('/') {
            url
        } else {
            return Err(StorageError::OperationFailed {
                operation: "parse_storage_url".to_string(),
                reason: format!("Unsupported storage URL: {}", url),
            });
        };

        let local_config = LocalConfig {
            base_path: std::path::PathBuf::from(path),
            ..Default::default()
        };
        Ok(Box::new(Self::create_local(local_config)?))
    }
}

/// Key helpers
pub mod utils {
    use super::constants::{MAX_KEY_LENGTH, NAMESPACE_SEPARATOR};
    use crate::error::{StorageError, StorageResult};

    /// Validate storage key
    pub fn validate_key(key: &str) -> StorageResult<()> {
        let reason = if key.is_empty() {
            "Key cannot be empty".to_string()
        } else if key.len() > MAX_KEY_LENGTH {
            format!("Key too long (max {} bytes)", MAX_KEY_LENGTH)
        } else if key.contains(['\0', '\n', '\r']) {
            "Key contains invalid characters".to_string()
        } else {
            return Ok(());
        };

        Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    }

    /// Join a prefix and an id as `prefix:id`
    pub fn namespaced_key(prefix: &str, id: &str) -> String {
        format!("{}{}{}", prefix, NAMESPACE_SEPARATOR, id)
    }

    /// The id part of a `prefix:id` key, if `key` belongs to `prefix`
    pub fn strip_namespace<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
        key.strip_prefix(prefix)?.strip_prefix(NAMESPACE_SEPARATOR)
    }
}
