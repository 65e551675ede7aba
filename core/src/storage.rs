//! Durable key/value storage for session data
//!
//! Holds the bearer token, the signed-in user and the active account id
//! between runs. Values are plain strings; callers own the encoding.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CourierError, CourierResult};

/// String key/value store
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> CourierResult<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> CourierResult<()>;
}

/// In-memory store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries
    pub fn with_entries<K: Into<String>, V: Into<String>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CourierResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CourierResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Store persisted as a JSON object in a single file
///
/// The file is read once on open and rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store, starting empty when the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> CourierResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    CourierError::storage(format!("Corrupt session file {}: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened session store at {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> CourierResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash never leaves a truncated file
        let temp_path = self.path.with_extension("tmp");
        write_private(&temp_path, &serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// Owner read/write only; the file holds the bearer token
#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

fn write_private(path: &Path, data: &[u8]) -> CourierResult<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(SESSION_FILE_MODE);
    }

    let mut file = options.open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its old bits
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(SESSION_FILE_MODE))?;
    }
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CourierResult<()> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> CourierResult<()> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Write a value, logging instead of failing
pub(crate) fn persist(store: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        warn!("Failed to persist '{}': {}", key, e);
    }
}

/// Remove a value, logging instead of failing
pub(crate) fn forget(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        warn!("Failed to remove '{}': {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::with_entries([("token", "abc")]);
        assert_eq!(store.get("token").as_deref(), Some("abc"));

        store.set("activeAccountId", "3").unwrap();
        assert_eq!(store.get("activeAccountId").as_deref(), Some("3"));

        store.remove("token").unwrap();
        store.remove("token").unwrap();
        assert_eq!(store.get("token"), None);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("token"), None);
        store.set("token", "abc").unwrap();
        store.set("user", r#"{"email":"me@example.com"}"#).unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("token").as_deref(), Some("abc"));
        assert_eq!(reopened.get("user").as_deref(), Some(r#"{"email":"me@example.com"}"#));

        reopened.remove("token").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("token"), None);
        assert!(reopened.get("user").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        // Stale temp file from an interrupted write
        std::fs::write(path.with_extension("tmp"), "{}").unwrap();
        std::fs::set_permissions(path.with_extension("tmp"), std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::open(&path).unwrap();
        store.set("token", "secret-bearer").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(FileStore::open(&path).unwrap().get("token").as_deref(), Some("secret-bearer"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileStore::open(&path).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Storage);
    }

    #[test]
    fn test_persist_swallows_errors() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_set()
            .times(1)
            .returning(|_, _| Err(CourierError::storage("quota exceeded")));
        persist(&store, "token", "abc");
    }
}
