//! Permission storage trait and implementations.

use super::user::UserPermissions;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Errors that can occur in permission store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to read records from storage.
    #[error("Failed to read permissions: {0}")]
    Read(String),

    /// Failed to write records to storage.
    #[error("Failed to write permissions: {0}")]
    Write(String),

    /// IO error during storage operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for permission storage implementations.
///
/// Records are keyed by username; saving a record replaces any previous
/// record for the same user.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Save (insert or replace) a user's record.
    async fn save(&self, record: UserPermissions) -> Result<(), StoreError>;

    /// Load the record for a user, if any.
    async fn load(&self, username: &str) -> Result<Option<UserPermissions>, StoreError>;

    /// Load every record, ordered by username.
    async fn load_all(&self) -> Result<Vec<UserPermissions>, StoreError>;

    /// Remove a user's record.
    ///
    /// Returns `true` if a record was removed, `false` if not found.
    async fn delete(&self, username: &str) -> Result<bool, StoreError>;

    /// Remove every record.
    async fn clear(&self) -> Result<(), StoreError>;
}

type Records = BTreeMap<String, UserPermissions>;

/// In-memory permission store.
///
/// Records are lost when the process exits.
#[derive(Default)]
pub struct MemoryPermissionStore {
    records: RwLock<Records>,
}

impl MemoryPermissionStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn save(&self, record: UserPermissions) -> Result<(), StoreError> {
        self.records.write().insert(record.username.clone(), record);
        Ok(())
    }

    async fn load(&self, username: &str) -> Result<Option<UserPermissions>, StoreError> {
        Ok(self.records.read().get(username).cloned())
    }

    async fn load_all(&self) -> Result<Vec<UserPermissions>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn delete(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().remove(username).is_some())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records.write().clear();
        Ok(())
    }
}

/// File-based permission store.
///
/// Records are persisted to a JSON object keyed by username. The file is
/// created, along with missing parent directories, on the first write.
/// A write that fails leaves the cached records as they were before it.
pub struct FilePermissionStore {
    path: PathBuf,
    cache: RwLock<Option<Records>>,
}

impl FilePermissionStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Load records from file into cache if not already loaded.
    fn ensure_loaded(&self) -> Result<(), StoreError> {
        let mut cache = self.cache.write();
        if cache.is_some() {
            return Ok(());
        }

        let records = if self.path.exists() {
            let contents = std::fs::read_to_string(&self.path)?;
            if contents.trim().is_empty() {
                Records::new()
            } else {
                serde_json::from_str(&contents).map_err(|e| {
                    StoreError::Read(format!("{}: {}", self.path.display(), e))
                })?
            }
        } else {
            Records::new()
        };

        *cache = Some(records);
        Ok(())
    }

    /// Write cache to file.
    fn flush(&self) -> Result<(), StoreError> {
        let cache = self.cache.read();
        if let Some(ref records) = *cache {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let json = serde_json::to_string_pretty(records)?;
            std::fs::write(&self.path, json)
                .map_err(|e| StoreError::Write(format!("{}: {}", self.path.display(), e)))?;
        }
        Ok(())
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut Records) -> T) -> Result<T, StoreError> {
        self.ensure_loaded()?;
        let mut cache = self.cache.write();
        Ok(f(cache.get_or_insert_with(Records::new)))
    }
}

#[async_trait]
impl PermissionStore for FilePermissionStore {
    async fn save(&self, record: UserPermissions) -> Result<(), StoreError> {
        let username = record.username.clone();
        let previous = self.with_records(|records| records.insert(username.clone(), record))?;
        if let Err(e) = self.flush() {
            // Cache must keep matching the file
            self.with_records(|records| match previous {
                Some(previous) => records.insert(username, previous),
                None => records.remove(&username),
            })?;
            return Err(e);
        }
        Ok(())
    }

    async fn load(&self, username: &str) -> Result<Option<UserPermissions>, StoreError> {
        self.with_records(|records| records.get(username).cloned())
    }

    async fn load_all(&self) -> Result<Vec<UserPermissions>, StoreError> {
        self.with_records(|records| records.values().cloned().collect())
    }

    async fn delete(&self, username: &str) -> Result<bool, StoreError> {
        let Some(removed) = self.with_records(|records| records.remove(username))? else {
            return Ok(false);
        };
        if let Err(e) = self.flush() {
            self.with_records(|records| records.insert(username.to_string(), removed))?;
            return Err(e);
        }
        Ok(true)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let previous = self.with_records(std::mem::take)?;
        if let Err(e) = self.flush() {
            self.with_records(|records| *records = previous)?;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::GrantRule;

    fn record(username: &str, pattern: &str) -> UserPermissions {
        UserPermissions::new(username, vec![GrantRule::bare(pattern)])
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryPermissionStore::new();

        // Initially empty
        assert!(store.load("alice").await.unwrap().is_none());
        assert!(store.load_all().await.unwrap().is_empty());

        store.save(record("alice", "test.ping")).await.unwrap();

        let loaded = store.load("alice").await.unwrap().unwrap();
        assert_eq!(loaded.perms, vec![GrantRule::bare("test.ping")]);
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_save_replaces() {
        let store = MemoryPermissionStore::new();

        store.save(record("alice", "test.ping")).await.unwrap();
        store.save(record("alice", "pkg.list")).await.unwrap();

        let loaded = store.load("alice").await.unwrap().unwrap();
        assert_eq!(loaded.perms, vec![GrantRule::bare("pkg.list")]);
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_load_all_ordered() {
        let store = MemoryPermissionStore::new();

        store.save(record("carol", "a")).await.unwrap();
        store.save(record("alice", "b")).await.unwrap();
        store.save(record("bob", "c")).await.unwrap();

        let names: Vec<_> = store
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = MemoryPermissionStore::new();
        store.save(record("alice", "test.ping")).await.unwrap();

        assert!(store.delete("alice").await.unwrap());
        assert!(!store.delete("alice").await.unwrap());
        assert!(store.load("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryPermissionStore::new();
        store.save(record("a", "x")).await.unwrap();
        store.save(record("b", "y")).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_basic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("perms.json");

        let store = FilePermissionStore::new(&path);

        // Initially empty (file doesn't exist)
        assert!(store.load("alice").await.unwrap().is_none());
        assert!(!path.exists());

        store.save(record("alice", "test.ping")).await.unwrap();
        assert!(path.exists());

        // New instance reads the persisted record
        let store2 = FilePermissionStore::new(&path);
        let loaded = store2.load("alice").await.unwrap().unwrap();
        assert_eq!(loaded.perms, vec![GrantRule::bare("test.ping")]);
    }

    #[tokio::test]
    async fn test_file_store_writes_raw_perms_shape() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("perms.json");

        let store = FilePermissionStore::new(&path);
        store.save(record("alice", "test.ping")).await.unwrap();

        let contents: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(contents["alice"]["perms"], serde_json::json!(["test.ping"]));
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/dir/perms.json");

        let store = FilePermissionStore::new(&path);
        store.save(record("alice", "test.ping")).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_file_store_handles_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("perms.json");
        std::fs::write(&path, "").unwrap();

        let store = FilePermissionStore::new(&path);
        assert!(store.load_all().await.unwrap().is_empty());

        store.save(record("alice", "test.ping")).await.unwrap();
        assert!(store.load("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_store_rejects_invalid_perms() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("perms.json");
        std::fs::write(
            &path,
            r#"{"alice": {"username": "alice", "perms": [42], "updated_at": "2024-01-01T00:00:00Z"}}"#,
        )
        .unwrap();

        let store = FilePermissionStore::new(&path);
        let err = store.load("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Read(_)));
    }

    #[tokio::test]
    async fn test_file_store_delete_and_clear() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("perms.json");

        let store = FilePermissionStore::new(&path);
        store.save(record("alice", "a")).await.unwrap();
        store.save(record("bob", "b")).await.unwrap();

        assert!(store.delete("alice").await.unwrap());
        assert!(!store.delete("alice").await.unwrap());

        let reopened = FilePermissionStore::new(&path);
        assert_eq!(reopened.load_all().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        let reopened = FilePermissionStore::new(&path);
        assert!(reopened.load_all().await.unwrap().is_empty());
    }

    // ===== Write failures =====

    /// Swap the store's file for a directory so the next flush fails.
    fn block_writes(path: &std::path::Path) {
        std::fs::remove_file(path).unwrap();
        std::fs::create_dir(path).unwrap();
    }

    #[tokio::test]
    async fn test_file_store_failed_save_restores_previous_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("perms.json");

        let store = FilePermissionStore::new(&path);
        store.save(record("alice", "test.ping")).await.unwrap();
        block_writes(&path);

        let err = store.save(record("alice", "pkg.list")).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        let loaded = store.load("alice").await.unwrap().unwrap();
        assert_eq!(loaded.perms, vec![GrantRule::bare("test.ping")]);

        assert!(store.save(record("bob", "x")).await.is_err());
        assert!(store.load("bob").await.unwrap().is_none());
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_failed_save_without_parent_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let store = FilePermissionStore::new(blocker.join("perms.json"));
        assert!(store.save(record("alice", "test.ping")).await.is_err());
        assert!(store.load("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_failed_delete_and_clear_keep_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("perms.json");

        let store = FilePermissionStore::new(&path);
        store.save(record("alice", "a")).await.unwrap();
        store.save(record("bob", "b")).await.unwrap();
        block_writes(&path);

        assert!(store.delete("alice").await.is_err());
        assert!(store.load("alice").await.unwrap().is_some());
        // Unknown users never touch the file
        assert!(!store.delete("carol").await.unwrap());

        assert!(store.clear().await.is_err());
        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }
}
