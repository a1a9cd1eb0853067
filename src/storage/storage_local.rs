//! Local filesystem storage backend implementation
//!
//! The whole key space lives in a single JSON object file under a base
//! directory, mapping each key to its stored string. Every operation reads the
//! file, applies its change and, for mutations, writes the file back:
//! - Missing file means an empty store
//! - Atomic writes through uniquely named temporary files
//! - Load, modify and write back happen under one lock per instance
//! - Unix permissions on the store file and its directory
//! - Byte quota on the sum of key and value lengths

use crate::error::{StorageError, StorageResult};
use crate::storage::adapter::StorageAdapter;
use crate::storage::constants::DEFAULT_QUOTA_BYTES;
use crate::utils::entry_size;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::trace;

type Entries = BTreeMap<String, String>;

/// Local storage configuration
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Base directory for storage
    pub base_path: PathBuf,
    /// Name of the store file inside `base_path`
    pub file_name: String,
    /// Create directories if they don't exist
    pub create_dirs: bool,
    /// Use atomic writes (write to temp file, then rename)
    pub atomic_writes: bool,
    /// File permissions (Unix only)
    pub file_permissions: Option<u32>,
    /// Directory permissions (Unix only)
    pub dir_permissions: Option<u32>,
    /// Maximum bytes of keys plus values the store may hold
    pub quota_bytes: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./storage"),
            file_name: "local_storage.json".to_string(),
            create_dirs: true,
            atomic_writes: true,
            file_permissions: Some(0o644),
            dir_permissions: Some(0o755),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

/// Local filesystem storage backend.
///
/// Operations on one instance are serialized, so it can be shared between
/// threads (for example behind an `Arc`). Separate instances or processes
/// pointing at the same file are not coordinated.
#[derive(Debug)]
pub struct LocalStorage {
    config: LocalConfig,
    file_path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new local storage backend
    pub fn new(local_config: LocalConfig) -> StorageResult<Self> {
        if local_config.file_name.is_empty() || local_config.file_name.contains(['/', '\\']) {
            return Err(StorageError::operation(
                "verify_file_name",
                format!("Invalid store file name: {:?}", local_config.file_name),
            ));
        }

        // Create base directory if it doesn't exist
        if local_config.create_dirs && !local_config.base_path.exists() {
            fs::create_dir_all(&local_config.base_path).map_err(|e| {
                StorageError::operation(
                    "create_base_directory",
                    format!("Failed to create base directory: {}", e),
                )
            })?;

            #[cfg(unix)]
            if let Some(perms) = local_config.dir_permissions {
                use std::os::unix::fs::PermissionsExt;
                let permissions = fs::Permissions::from_mode(perms);
                fs::set_permissions(&local_config.base_path, permissions).map_err(|e| {
                    StorageError::operation(
                        "set_directory_permissions",
                        format!("Failed to set directory permissions: {}", e),
                    )
                })?;
            }
        }

        if !local_config.base_path.exists() {
            return Err(StorageError::operation(
                "verify_base_directory",
                "Base directory does not exist and create_dirs is disabled",
            ));
        }

        if !local_config.base_path.is_dir() {
            return Err(StorageError::operation(
                "verify_base_directory",
                "Base path exists but is not a directory",
            ));
        }

        let file_path = local_config.base_path.join(&local_config.file_name);
        Ok(Self {
            config: local_config,
            file_path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the JSON file backing this store
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Active configuration
    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    /// Bytes in use, counted as key plus value length
    pub fn usage(&self) -> StorageResult<usize> {
        let _guard = self.guard()?;
        Ok(usage_of(&self.load()?))
    }

    fn guard(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| StorageError::operation("local_store_lock", e))
    }

    fn load(&self) -> StorageResult<Entries> {
        let file = match File::open(&self.file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(StorageError::PermissionDenied {
                    resource: self.file_path.to_string_lossy().to_string(),
                })
            }
            Err(e) => {
                return Err(StorageError::operation(
                    "open_store",
                    format!("Failed to open store file: {}", e),
                ))
            }
        };

        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            StorageError::operation("load_store", format!("Corrupt store file: {}", e))
        })
    }

    fn persist(&self, entries: &Entries) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::operation("serialize_store", e))?;

        if self.config.atomic_writes {
            let mut temp = NamedTempFile::new_in(&self.config.base_path).map_err(|e| {
                StorageError::operation(
                    "create_temp_file",
                    format!("Failed to create temporary file: {}", e),
                )
            })?;
            write_all(temp.as_file_mut(), &data)?;
            self.apply_permissions(temp.path())?;
            temp.persist(&self.file_path).map_err(|e| {
                StorageError::operation(
                    "atomic_rename",
                    format!("Failed to replace store file: {}", e.error),
                )
            })?;
        } else {
            let mut file = File::create(&self.file_path).map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                    resource: self.file_path.to_string_lossy().to_string(),
                },
                _ => StorageError::operation("create_file", format!("Failed to create file: {}", e)),
            })?;
            write_all(&mut file, &data)?;
            self.apply_permissions(&self.file_path)?;
        }

        Ok(())
    }

    #[cfg_attr(not(unix), allow(unused_variables))]
    fn apply_permissions(&self, path: &Path) -> StorageResult<()> {
        #[cfg(unix)]
        if let Some(perms) = self.config.file_permissions {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(perms);
            fs::set_permissions(path, permissions).map_err(|e| {
                StorageError::operation(
                    "set_file_permissions",
                    format!("Failed to set file permissions: {}", e),
                )
            })?;
        }
        Ok(())
    }
}

fn usage_of(entries: &Entries) -> usize {
    entries.iter().map(|(k, v)| entry_size(k, v)).sum()
}

fn write_all(file: &mut File, data: &[u8]) -> StorageResult<()> {
    let mut writer = BufWriter::new(file);
    writer
        .write_all(data)
        .map_err(|e| StorageError::operation("write_file", format!("Failed to write file: {}", e)))?;
    writer
        .flush()
        .map_err(|e| StorageError::operation("flush_file", format!("Failed to flush file: {}", e)))?;
    Ok(())
}

impl StorageAdapter for LocalStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.guard()?;
        let mut entries = self.load()?;
        Ok(entries.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.guard()?;
        let mut entries = self.load()?;

        // Each write rewrites the whole file, so summing usage here stays linear.
        let replaced = entries.get(key).map_or(0, |old| entry_size(key, old));
        let requested = usage_of(&entries) - replaced + entry_size(key, value);
        if requested > self.config.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                requested,
                quota: self.config.quota_bytes,
            });
        }

        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)?;
        trace!(key, bytes = requested, "stored item on disk");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let _guard = self.guard()?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
            trace!(key, "removed item from disk");
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let _guard = self.guard()?;
        Ok(self.load()?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (LocalStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let local_config = LocalConfig {
            base_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let storage = LocalStorage::new(local_config).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_local_config_default() {
        let config = LocalConfig::default();
        assert_eq!(config.base_path, PathBuf::from("./storage"));
        assert_eq!(config.file_name, "local_storage.json");
        assert!(config.create_dirs);
        assert!(config.atomic_writes);
        assert_eq!(config.quota_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_set_and_get() {
        let (storage, _temp_dir) = create_test_storage();

        assert_eq!(storage.get_item("missing").unwrap(), None);
        assert!(!storage.file_path().exists());

        storage.set_item("user:1", "{\"id\":1}").unwrap();
        assert!(storage.file_path().exists());
        assert_eq!(storage.get_item("user:1").unwrap().as_deref(), Some("{\"id\":1}"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (storage, _temp_dir) = create_test_storage();

        storage.remove_item("never-set").unwrap();
        storage.set_item("k", "1").unwrap();
        storage.remove_item("k").unwrap();
        storage.remove_item("k").unwrap();
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_instances() {
        let (storage, temp_dir) = create_test_storage();
        storage.set_item("b", "2").unwrap();
        storage.set_item("a", "1").unwrap();
        drop(storage);

        let reopened = LocalStorage::new(LocalConfig {
            base_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(reopened.usage().unwrap(), 4);
    }

    #[test]
    fn test_quota() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(LocalConfig {
            base_path: temp_dir.path().to_path_buf(),
            quota_bytes: 8,
            ..Default::default()
        })
        .unwrap();

        storage.set_item("key", "12345").unwrap();
        let err = storage.set_item("key2", "1").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 8, .. }));
        assert_eq!(storage.get_item("key").unwrap().as_deref(), Some("12345"));
    }

    #[test]
    fn test_direct_writes() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(LocalConfig {
            base_path: temp_dir.path().to_path_buf(),
            atomic_writes: false,
            ..Default::default()
        })
        .unwrap();

        storage.set_item("k", "\"v\"").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("\"v\""));
        assert!(!storage.file_path().with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file() {
        let (storage, _temp_dir) = create_test_storage();
        fs::write(storage.file_path(), "not json").unwrap();

        let err = storage.keys().unwrap_err();
        assert!(matches!(
            err,
            StorageError::OperationFailed { ref operation, .. } if operation == "load_store"
        ));
    }

    #[test]
    fn test_accepts_any_key() {
        let (storage, _temp_dir) = create_test_storage();

        for key in ["", "line\nbreak", "cr\rnul\0", "\u{1F511}:id"] {
            storage.set_item(key, "1").unwrap();
        }
        assert_eq!(storage.get_item("").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get_item("line\nbreak").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.keys().unwrap().len(), 4);

        storage.remove_item("cr\rnul\0").unwrap();
        assert_eq!(storage.get_item("cr\rnul\0").unwrap(), None);
    }

    #[test]
    fn test_concurrent_writers_keep_every_entry() {
        use std::sync::Arc;
        use std::thread;

        let (storage, _temp_dir) = create_test_storage();
        let storage = Arc::new(storage);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    for i in 0..25 {
                        storage.set_item(&format!("t{}:{}", t, i), "1").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let keys = storage.keys().unwrap();
        assert_eq!(keys.len(), 200);
        assert_eq!(storage.get_item("t7:24").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_tmp_suffixed_store_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(LocalConfig {
            base_path: temp_dir.path().to_path_buf(),
            file_name: "store.tmp".to_string(),
            ..Default::default()
        })
        .unwrap();

        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        // Only the store file remains; temporary files were renamed over it.
        let files: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_base_dir_without_create() {
        let temp_dir = TempDir::new().unwrap();
        let result = LocalStorage::new(LocalConfig {
            base_path: temp_dir.path().join("absent"),
            create_dirs: false,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_file_name_with_separator() {
        let temp_dir = TempDir::new().unwrap();
        let result = LocalStorage::new(LocalConfig {
            base_path: temp_dir.path().to_path_buf(),
            file_name: "nested/store.json".to_string(),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
