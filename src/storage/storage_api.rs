//! High-level JSON storage API
//!
//! [`JsonStorage`] sits on top of any [`StorageAdapter`] and owns the JSON
//! encoding of stored values, the support probe, and prefix cleanup. It keeps
//! no copy of the data; the adapter is the only source of truth.

use crate::error::{Error, Result, StorageError, StorageResult};
use crate::storage::adapter::StorageAdapter;
use crate::storage::constants::{DEFAULT_PROBE_KEY, DEFAULT_UNSUPPORTED_HINT};
use crate::storage::utils::validate_key;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Configuration for [`JsonStorage`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Throwaway key written and removed by [`JsonStorage::check_support`]
    pub probe_key: String,
    /// Remediation hint attached to a failed support probe
    pub unsupported_hint: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            probe_key: DEFAULT_PROBE_KEY.to_string(),
            unsupported_hint: DEFAULT_UNSUPPORTED_HINT.to_string(),
        }
    }
}

impl StorageConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the probe key is non-empty, bounded and free of control line breaks
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.probe_key).map_err(|e| Error::Configuration {
            message: format!("probe_key: {}", e),
        })
    }
}

/// Outcome of reading a key through [`JsonStorage::get`]
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The key exists and holds valid JSON (possibly `null`)
    Present(Value),
    /// The key does not exist, or holds an empty string
    Absent,
    /// The key exists but its contents are not JSON
    Malformed {
        /// Stored text as read from the adapter
        raw: String,
        /// Decoder message
        reason: String,
    },
}

impl Lookup {
    /// The decoded value, if present
    pub fn value(&self) -> Option<&Value> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Consume the lookup, keeping only a decoded value
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the key was absent
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// Whether the stored contents failed to decode
    pub fn is_malformed(&self) -> bool {
        matches!(self, Lookup::Malformed { .. })
    }
}

/// JSON-aware wrapper over a string-valued store.
///
/// ```rust
/// use local_storage_rust::storage::{JsonStorage, Lookup, MemoryAdapter};
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = JsonStorage::new(MemoryAdapter::new());
/// assert!(storage.check_support()?);
///
/// storage.set("pki:role:1", &json!({"ttl": 3600}))?;
/// storage.set("pki:role:2", &json!(null))?;
/// assert_eq!(storage.get("pki:role:2")?, Lookup::Present(json!(null)));
///
/// let removed = storage.cleanup("pki:role:", Some("pki:role:1"))?;
/// assert_eq!(removed, 1);
/// assert_eq!(storage.keys()?, vec!["pki:role:1".to_string()]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonStorage<A> {
    adapter: A,
    config: StorageConfig,
}

impl<A: StorageAdapter> JsonStorage<A> {
    /// Wrap `adapter` with the default configuration
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, StorageConfig::default())
    }

    /// Wrap `adapter` with an explicit configuration
    pub fn with_config(adapter: A, config: StorageConfig) -> Self {
        Self { adapter, config }
    }

    /// The wrapped store
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Active configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Probe the store by writing and removing the probe key.
    ///
    /// Returns `Ok(true)` when both steps succeed. Any failure is wrapped in
    /// [`StorageError::Unsupported`] together with the configured hint.
    pub fn check_support(&self) -> StorageResult<bool> {
        let probe = &self.config.probe_key;
        let outcome = self
            .adapter
            .set_item(probe, "null")
            .and_then(|()| self.adapter.remove_item(probe));

        match outcome {
            Ok(()) => {
                debug!(probe_key = %probe, "storage support probe succeeded");
                Ok(true)
            }
            Err(source) => {
                warn!(probe_key = %probe, error = %source, "storage support probe failed");
                Err(StorageError::Unsupported {
                    hint: self.config.unsupported_hint.clone(),
                    source: Box::new(source),
                })
            }
        }
    }

    /// Like [`check_support`](Self::check_support), reporting failure as `false`
    pub fn is_supported(&self) -> bool {
        self.check_support().is_ok()
    }

    /// Read and decode the value under `key`
    pub fn get(&self, key: &str) -> StorageResult<Lookup> {
        let raw = match self.adapter.get_item(key)? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Lookup::Absent),
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Lookup::Present(value)),
            Err(e) => {
                warn!(key, error = %e, "stored value is not valid JSON");
                Ok(Lookup::Malformed {
                    raw,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Read the value under `key` as a `T`.
    ///
    /// Absent keys give `Ok(None)`; contents that are not JSON or do not fit
    /// `T` give [`StorageError::DecodeFailed`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Lookup::Absent => Ok(None),
            Lookup::Malformed { reason, .. } => Err(StorageError::DecodeFailed {
                key: key.to_string(),
                reason,
            }),
            Lookup::Present(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                StorageError::DecodeFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }

    /// Encode `value` as JSON and store it under `key`, replacing any previous value
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let encoded = serde_json::to_string(value).map_err(|e| StorageError::EncodeFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.adapter.set_item(key, &encoded)?;
        trace!(key, bytes = encoded.len(), "stored item");
        Ok(())
    }

    /// Delete `key`. Absent keys are not an error.
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        self.adapter.remove_item(key)?;
        trace!(key, "removed item");
        Ok(())
    }

    /// Whether `key` exists, without decoding it
    pub fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.adapter.get_item(key)?.is_some())
    }

    /// Every key currently in the store
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        self.adapter.keys()
    }

    /// Remove every key starting with `prefix` except `key_to_keep`.
    ///
    /// An empty prefix removes nothing. Returns the number of removed keys.
    pub fn cleanup(&self, prefix: &str, key_to_keep: Option<&str>) -> StorageResult<usize> {
        if prefix.is_empty() {
            return Ok(0);
        }

        let doomed: Vec<String> = self
            .adapter
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix) && Some(key.as_str()) != key_to_keep)
            .collect();

        for key in &doomed {
            self.adapter.remove_item(key)?;
        }

        debug!(prefix, kept = ?key_to_keep, removed = doomed.len(), "cleaned up storage prefix");
        Ok(doomed.len())
    }
}
