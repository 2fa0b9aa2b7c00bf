use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::KeyValueStore;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Extension given to a session file that failed to parse
const CORRUPT_EXTENSION: &str = "json.corrupt";

/// JSON-file backed store. Every mutation rewrites the file so the state
/// survives a restart, the way browser local storage survives a reload.
///
/// A mutation is applied in memory only after the file was written, so a
/// failed write leaves both views at the previous state.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store in `cache_dir`.
    ///
    /// A session file that does not parse is moved aside and the store
    /// starts empty, so a damaged file never locks the user out.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(SESSION_FILE);
        let entries: BTreeMap<String, String> = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    let aside = path.with_extension(CORRUPT_EXTENSION);
                    warn!(
                        error = %e,
                        moved_to = %aside.display(),
                        "Session file is corrupt, starting anonymous"
                    );
                    if let Err(e) = std::fs::rename(&path, &aside) {
                        warn!(error = %e, "Failed to move corrupt session file aside");
                    }
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "Session store opened");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.remove_all(&[key])
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if !keys.iter().any(|key| entries.contains_key(*key)) {
            return Ok(());
        }
        let mut next = entries.clone();
        for key in keys {
            next.remove(*key);
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "phishdash-file-store-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::remove_file(&dir);
        dir
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = scratch_dir("reopen");

        let store = FileStore::open(&dir).unwrap();
        store.set("access_token", "abc123").unwrap();
        store.set("username", "alice").unwrap();
        drop(store);

        let reopened = FileStore::open(&dir).unwrap();
        assert_eq!(reopened.get("access_token").as_deref(), Some("abc123"));
        assert_eq!(reopened.get("username").as_deref(), Some("alice"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_remove_all_persists() {
        let dir = scratch_dir("remove-all");

        let store = FileStore::open(&dir).unwrap();
        store.set("access_token", "abc123").unwrap();
        store.set("is_admin", "1").unwrap();
        store.remove_all(&["access_token", "is_admin"]).unwrap();
        drop(store);

        let reopened = FileStore::open(&dir).unwrap();
        assert_eq!(reopened.get("access_token"), None);
        assert_eq!(reopened.get("is_admin"), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_dir_is_empty_store() {
        let dir = scratch_dir("missing");
        let store = FileStore::open(&dir).unwrap();
        assert_eq!(store.get("access_token"), None);
        // Nothing written until the first mutation
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = scratch_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SESSION_FILE), "not json").unwrap();

        let store = FileStore::open(&dir).unwrap();
        assert_eq!(store.get("access_token"), None);
        assert!(!store.path().exists());
        assert_eq!(
            std::fs::read_to_string(dir.join("session.json.corrupt")).unwrap(),
            "not json"
        );

        // Usable again after the next write
        store.set("access_token", "abc123").unwrap();
        let reopened = FileStore::open(&dir).unwrap();
        assert_eq!(reopened.get("access_token").as_deref(), Some("abc123"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    /// A store whose cache dir is a regular file, so every write fails
    fn unwritable_store(name: &str) -> (FileStore, PathBuf) {
        let dir = scratch_dir(name);
        let parent = dir.parent().unwrap().to_path_buf();
        std::fs::create_dir_all(&parent).unwrap();
        std::fs::write(&dir, "in the way").unwrap();
        (FileStore::open(&dir).unwrap(), dir)
    }

    #[test]
    fn test_failed_set_leaves_value_unchanged() {
        let (store, dir) = unwritable_store("set-fails");

        assert!(store.set("access_token", "abc123").is_err());
        assert_eq!(store.get("access_token"), None);

        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn test_failed_remove_keeps_value() {
        let dir = scratch_dir("remove-fails");
        let store = FileStore::open(&dir).unwrap();
        store.set("access_token", "abc123").unwrap();

        // Replace the directory with a file so the next write fails
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "in the way").unwrap();

        assert!(store.remove_all(&["access_token"]).is_err());
        assert_eq!(store.get("access_token").as_deref(), Some("abc123"));

        let _ = std::fs::remove_file(&dir);
    }
}
