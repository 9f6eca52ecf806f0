//! Durable client-side key-value storage.

pub mod resume;
pub mod settings;

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::PathBuf,
};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::warn;

use crate::common::errors::{ReplayError, ReplayResult};

pub use resume::ResumeStore;
pub use settings::{ChatSettings, ChatSettingsStore};

/// String blobs under string keys, in the manner of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ReplayResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ReplayResult<()>;
    fn remove(&self, key: &str) -> ReplayResult<()>;
}

/// Process-local store, lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ReplayResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> ReplayResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ReplayResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file, rewritten atomically on every change.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> ReplayResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> ReplayResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> ReplayResult<()> {
        let _guard = self.lock.lock();
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(ReplayError::Decode(e)) => {
                warn!(
                    "Storage file {} is unreadable, starting over: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ReplayResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ReplayResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> ReplayResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A store whose every operation fails, standing in for unavailable storage.
    pub(crate) struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> ReplayResult<Option<String>> {
            Err(ReplayError::Storage(io::Error::other("quota exceeded")))
        }

        fn set(&self, _key: &str, _value: &str) -> ReplayResult<()> {
            Err(ReplayError::Storage(io::Error::other("quota exceeded")))
        }

        fn remove(&self, _key: &str) -> ReplayResult<()> {
            Err(ReplayError::Storage(io::Error::other("quota exceeded")))
        }
    }

    pub(crate) fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vodsync-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let path = temp_path("kv");
        let _ = fs::remove_file(&path);

        let store = FileStore::new(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let path = temp_path("corrupt-kv");
        fs::write(&path, "{not json").unwrap();
        assert!(FileStore::new(&path).get("a").is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_recovers_from_corruption_on_write() {
        let path = temp_path("recover-kv");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        fs::write(&path, "[[[").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
