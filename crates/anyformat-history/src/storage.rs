use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Whole-value string slots addressed by key, like browser local storage.
///
/// There is no partial update: callers read a value, change it, and write
/// the whole value back.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

fn check_quota(quota: Option<usize>, needed: usize) -> Result<(), StorageError> {
    match quota {
        Some(quota) if needed > quota => Err(StorageError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

/// In-process storage with an optional byte quota across all values.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once the stored values would exceed `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            values: HashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_except(&self, key: &str) -> usize {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, self.used_except(key) + value.len())?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Directory-backed storage: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
}

const FILE_EXTENSION: &str = "json";

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: None,
        }
    }

    /// Limit the total size of all values in the directory to `quota` bytes.
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }

    fn used_except(&self, path: &Path) -> Result<usize, StorageError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut used = 0;
        for entry in entries {
            let entry = entry?;
            let entry_path = entry.path();
            if entry_path == path
                || entry_path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION)
            {
                continue;
            }
            used += entry.metadata()?.len() as usize;
        }
        Ok(used)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if self.quota.is_some() {
            check_quota(self.quota, self.used_except(&path)? + value.len())?;
        }

        std::fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a failed write leaves the previous value intact.
        let tmp = path.with_extension("tmp");
        if let Err(e) = std::fs::write(&tmp, value).and_then(|()| std::fs::rename(&tmp, &path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(path = %path.display(), bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_get_set_remove() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "v1").unwrap();
        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));

        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn memory_quota_counts_other_keys() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set("a", "123456").unwrap();
        // Overwriting the same key only counts the new value.
        storage.set("a", "1234567890").unwrap();

        let err = storage.set("b", "x").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 11,
                quota: 10
            }
        ));
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1234567890"));
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.dir(), dir.path().join("nested"));

        assert_eq!(storage.get("history").unwrap(), None);
        storage.set("history", "[1,2,3]").unwrap();
        assert!(dir.path().join("nested/history.json").exists());
        assert_eq!(storage.get("history").unwrap().as_deref(), Some("[1,2,3]"));

        // Survives a fresh handle on the same directory.
        let reopened = FileStorage::new(dir.path().join("nested"));
        assert_eq!(reopened.get("history").unwrap().as_deref(), Some("[1,2,3]"));

        storage.remove("history").unwrap();
        storage.remove("history").unwrap();
        assert_eq!(storage.get("history").unwrap(), None);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the value file belongs makes the rename fail.
        std::fs::create_dir(dir.path().join("history.json")).unwrap();
        let mut storage = FileStorage::new(dir.path());

        assert!(matches!(
            storage.set("history", "[]"),
            Err(StorageError::Io(_))
        ));
        assert!(!dir.path().join("history.tmp").exists());
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn file_storage_quota() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path()).with_quota(8);
        storage.set("a", "12345").unwrap();
        assert!(matches!(
            storage.set("b", "12345"),
            Err(StorageError::QuotaExceeded { .. })
        ));
        storage.set("a", "12345678").unwrap();
        assert_eq!(storage.get("b").unwrap(), None);
    }
}
