//! Key/value backends for the cart record.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::CartError;

/// Where the serialized cart lives between runs.
///
/// Values are whole documents; every save replaces the previous value.
pub trait CartStorage: Send + Sync {
    /// Read the raw value for `key`, or `None` if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, CartError>;

    /// Replace the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), CartError>;
}

/// One JSON file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never sees a half-written cart.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CartStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, CartError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CartError::Storage(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), CartError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &target)?;
        Ok(())
    }
}

/// In-process storage, used by tests and one-shot sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing cart serialization.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, CartError> {
        let values = self.values.lock().map_err(|_| CartError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), CartError> {
        let mut values = self.values.lock().map_err(|_| CartError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert!(storage.load("cart").unwrap().is_none());
        storage.save("cart", "[]").unwrap();
        assert_eq!(storage.load("cart").unwrap().as_deref(), Some("[]"));

        storage.save("cart", r#"[{"id":"t1"}]"#).unwrap();
        assert_eq!(
            storage.load("cart").unwrap().as_deref(),
            Some(r#"[{"id":"t1"}]"#)
        );
        assert!(!dir.path().join("nested/.cart.json.tmp").exists());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.load("cart").unwrap().is_none());
        storage.insert_raw("cart", "not json");
        assert_eq!(storage.load("cart").unwrap().as_deref(), Some("not json"));
    }
}
