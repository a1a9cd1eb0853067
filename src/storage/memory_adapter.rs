//! Memory storage adapter

use crate::error::{StorageError, StorageResult};
use crate::storage::adapter::StorageAdapter;
use crate::utils::entry_size;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Entries plus their running byte usage, kept in step under one lock
#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    usage: usize,
}

/// In-memory storage adapter.
///
/// Clones share the same entries, so a clone handed to [`JsonStorage`](crate::storage::JsonStorage)
/// can still be inspected from a test.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    inner: Arc<RwLock<Inner>>,
    quota: Option<usize>,
    writable: bool,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Create a new, unbounded memory adapter
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            quota: None,
            writable: true,
        }
    }

    /// Create a memory adapter that rejects writes once `quota` bytes are in use
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::new()
        }
    }

    /// Create a memory adapter that refuses every write, like a store blocked
    /// by privacy settings
    pub fn disabled() -> Self {
        Self {
            writable: false,
            ..Self::new()
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.read()?.entries.len())
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.read()?.entries.is_empty())
    }

    /// Bytes in use, counted as key plus value length
    pub fn usage(&self) -> StorageResult<usize> {
        Ok(self.read()?.usage)
    }

    /// Drop every entry
    pub fn clear(&self) -> StorageResult<()> {
        let mut inner = self.write()?;
        inner.entries.clear();
        inner.usage = 0;
        Ok(())
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StorageError::operation("memory_read_lock", e))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StorageError::operation("memory_write_lock", e))
    }
}

impl StorageAdapter for MemoryAdapter {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read()?.entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::PermissionDenied {
                resource: key.to_string(),
            });
        }

        let mut inner = self.write()?;
        let replaced = inner.entries.get(key).map_or(0, |old| entry_size(key, old));
        let requested = inner.usage - replaced + entry_size(key, value);
        if let Some(quota) = self.quota {
            if requested > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    requested,
                    quota,
                });
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.usage = requested;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut inner = self.write()?;
        if let Some(old) = inner.entries.remove(key) {
            inner.usage -= entry_size(key, &old);
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.read()?.entries.keys().cloned().collect())
    }
}
