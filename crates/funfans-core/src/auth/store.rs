//! Key-value persistence for the admin session slot.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;

/// Session file name in the cache directory
const SESSION_FILE: &str = "admin_session.json";

/// A flat string key-value store holding the session entries.
///
/// `get` never fails: anything unreadable is reported as absent.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a key that does not exist is not an error.
    fn clear(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn clear(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).clear(key)
    }
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object on disk.
///
/// The file is re-read on every access, so several processes pointed at the
/// same directory share one slot with last-writer-wins semantics.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries. Missing or corrupt files read as empty.
    fn load(&self) -> BTreeMap<String, String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = ?self.path, error = %e, "Session file unreadable, treating as empty");
                }
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = ?self.path, error = %e, "Session file malformed, treating as empty");
                BTreeMap::new()
            }
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StoreError::Write {
                    path: self.path.clone(),
                    source,
                }),
            };
        }

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: parent.to_path_buf(),
            source,
        })?;

        // Write beside the target and rename over it, so readers in other
        // processes see either the old file or the new one, never a partial write
        let contents = serde_json::to_string_pretty(entries)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(contents.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load();
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)
    }

    fn clear(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut entries = self.load();
        entries.remove(key);
        self.write(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_clear() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k"), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.clear("k").unwrap();
        assert_eq!(store.get("k"), None);

        // Clearing again is fine
        store.clear("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = FileStore::new(dir.path());
        first.set("funfansplay_admin_auth", "authenticated").unwrap();

        let second = FileStore::new(dir.path());
        assert_eq!(
            second.get("funfansplay_admin_auth").as_deref(),
            Some("authenticated")
        );
    }

    #[test]
    fn test_file_store_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = FileStore::new(dir.path());
        let mut b = FileStore::new(dir.path());

        a.set("k", "from-a").unwrap();
        b.set("k", "from-b").unwrap();
        assert_eq!(a.get("k").as_deref(), Some("from-b"));

        b.clear("k").unwrap();
        assert_eq!(a.get("k"), None);
    }

    #[test]
    fn test_file_store_removes_file_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear("a").unwrap();
        assert!(store.path().exists());

        store.clear("b").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        store.set("funfansplay_admin_auth", "authenticated").unwrap();
        store.set("funfansplay_admin_auth_time", "1748802600000").unwrap();
        store.set("funfansplay_admin_auth_time", "1748802660000").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["admin_session.json".to_string()]);

        let contents = std::fs::read_to_string(store.path()).unwrap();
        let entries: BTreeMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries.get("funfansplay_admin_auth_time").map(String::as_str),
            Some("1748802660000")
        );
    }

    #[test]
    fn test_file_store_overwrite_is_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FileStore::new(dir.path());
        let reader = FileStore::new(dir.path());

        for i in 0..50 {
            writer.set("funfansplay_admin_auth_time", &i.to_string()).unwrap();
            // Every read sees a complete file with the flag still present
            writer.set("funfansplay_admin_auth", "authenticated").unwrap();
            assert_eq!(
                reader.get("funfansplay_admin_auth").as_deref(),
                Some("authenticated")
            );
        }
    }

    #[test]
    fn test_file_store_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.get("funfansplay_admin_auth"), None);
    }

    #[test]
    fn test_file_store_clear_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("missing"));

        store.clear("k").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("nested").join("cache"));

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }
}
