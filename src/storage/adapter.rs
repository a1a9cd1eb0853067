//! Storage adapter trait and types

use crate::error::StorageResult;
use std::sync::Arc;

/// String-valued key-value store that [`JsonStorage`](crate::storage::JsonStorage) is written against.
///
/// Implementations own persistence only. JSON encoding, probing and cleanup
/// live in the adapter layer above.
pub trait StorageAdapter {
    /// Raw value stored under `key`, or `None` if the key is absent
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Deleting an absent key succeeds.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Every key currently in the store
    fn keys(&self) -> StorageResult<Vec<String>>;
}

impl<A: StorageAdapter + ?Sized> StorageAdapter for &A {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

impl<A: StorageAdapter + ?Sized> StorageAdapter for Box<A> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

impl<A: StorageAdapter + ?Sized> StorageAdapter for Arc<A> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}
