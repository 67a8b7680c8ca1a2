//! Local persistence of the selected apartment.
//!
//! The store keeps exactly one JSON record under a configured key. It sits on a
//! [`KeyValue`] capability so the backend can be swapped; two are provided:
//! [`FileKeyValue`] for real runs and [`MemoryKeyValue`] for tests.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{PersistedState, StoreError};

// ---

/// String key-value persistence.
pub trait KeyValue: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A backend shared between the store and other holders.
impl<T: KeyValue> KeyValue for Arc<T> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).remove(key)
    }
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValue {
    // ---
    dir: PathBuf,
}

impl FileKeyValue {
    // ---
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Keys may contain characters that are not valid in file names.
    ///
    /// Bytes outside `[A-Za-z0-9._-]` are written as `%XX`. `%` itself is
    /// always escaped, so distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        // ---
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                    name.push(char::from(byte))
                }
                _ => name.push_str(&format!("%{byte:02X}")),
            }
        }
        self.dir.join(format!("{name}.json"))
    }
}

fn backend_error(action: &str, path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Backend(format!("{action} {}: {e}", path.display()))
}

impl KeyValue for FileKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        // ---
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(backend_error("read", &path, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // ---
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| backend_error("create", &self.dir, e))?;

        let path = self.path_for(key);
        tokio::fs::write(&path, value)
            .await
            .map_err(|e| backend_error("write", &path, e))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        // ---
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend_error("remove", &path, e)),
        }
    }
}

/// In-process map; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValue {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StoreError> {
        // ---
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        Ok(f(&mut entries))
    }
}

impl KeyValue for MemoryKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}

/// Serialized length of the empty record; anything shorter is truncated.
pub fn minimum_record_len() -> usize {
    serde_json::to_string(&PersistedState::default()).map_or(0, |s| s.len())
}

/// The apartment record, stored under one key.
#[derive(Debug)]
pub struct Store<K> {
    // ---
    kv: K,
    key: String,
}

impl<K: KeyValue> Store<K> {
    // ---
    pub fn new(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    /// Read the record.
    ///
    /// Fails with `NotInitialized` if nothing is stored, and with `Corrupted`
    /// if the payload is shorter than an empty record or does not parse.
    pub async fn load(&self) -> Result<PersistedState, StoreError> {
        // ---
        let raw = match self.kv.get(&self.key).await? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(StoreError::NotInitialized),
        };

        let minimum = minimum_record_len();
        if raw.len() < minimum {
            return Err(StoreError::Corrupted(format!(
                "record is {} bytes, expected at least {}",
                raw.len(),
                minimum
            )));
        }

        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupted(e.to_string()))
    }

    /// Overwrite the record.
    pub async fn store(&self, state: &PersistedState) -> Result<(), StoreError> {
        // ---
        let json = serde_json::to_string(state)
            .map_err(|e| StoreError::Backend(format!("serialize: {e}")))?;
        debug!("Storing {} bytes under '{}'", json.len(), self.key);
        self.kv.set(&self.key, &json).await
    }

    /// Delete the record. Deleting a missing record is not an error.
    pub async fn clear(&self) -> Result<(), StoreError> {
        // ---
        debug!("Clearing '{}'", self.key);
        self.kv.remove(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::ApartmentId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "STORAGE:test-device";

    fn create_test_store() -> Store<MemoryKeyValue> {
        Store::new(MemoryKeyValue::new(), KEY)
    }

    fn unique_temp_dir() -> PathBuf {
        // ---
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir().join(format!(
            "apartment-climate-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
    }

    #[tokio::test]
    async fn test_round_trip() {
        // ---
        let store = create_test_store();
        let state = PersistedState::with_apartment(&ApartmentId::new("ABCDEFGHIJ"));

        store.store(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_empty_record_round_trip() {
        // ---
        let store = create_test_store();
        store.store(&PersistedState::default()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), PersistedState::default());
    }

    #[tokio::test]
    async fn test_load_without_record_is_not_initialized() {
        // ---
        let store = create_test_store();
        assert_eq!(store.load().await, Err(StoreError::NotInitialized));
    }

    #[tokio::test]
    async fn test_load_after_clear_is_not_initialized() {
        // ---
        let store = create_test_store();
        let state = PersistedState::with_apartment(&ApartmentId::new("ABCDEFGHIJ"));
        store.store(&state).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.load().await, Err(StoreError::NotInitialized));
    }

    #[tokio::test]
    async fn test_truncated_record_is_corrupted() {
        // ---
        let store = create_test_store();
        store.kv.set(KEY, r#"{"apartment":{}}"#).await.unwrap();

        assert!(matches!(store.load().await, Err(StoreError::Corrupted(_))));
    }

    #[tokio::test]
    async fn test_unparseable_record_is_corrupted() {
        // ---
        let store = create_test_store();
        store
            .kv
            .set(KEY, "this is definitely not a json record")
            .await
            .unwrap();

        assert!(matches!(store.load().await, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn test_minimum_record_len_matches_empty_record() {
        // ---
        assert_eq!(minimum_record_len(), r#"{"apartment":{"guid":""}}"#.len());
    }

    #[test]
    fn test_clear_missing_record_is_ok() {
        // ---
        let store = create_test_store();
        tokio_test::block_on(async {
            assert_eq!(store.clear().await, Ok(()));
        });
    }

    #[tokio::test]
    async fn test_file_backend_round_trip() {
        // ---
        let dir = unique_temp_dir();
        let store = Store::new(FileKeyValue::new(&dir), KEY);
        let state = PersistedState::with_apartment(&ApartmentId::new("0123456789abcdef"));

        assert_eq!(store.load().await, Err(StoreError::NotInitialized));
        store.store(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), state);

        store.clear().await.unwrap();
        assert_eq!(store.load().await, Err(StoreError::NotInitialized));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_names_are_sanitized() {
        // ---
        let kv = FileKeyValue::new("/tmp/x");
        assert_eq!(
            kv.path_for("STORAGE:my phone"),
            PathBuf::from("/tmp/x/STORAGE%3Amy%20phone.json")
        );
        assert_eq!(
            kv.path_for("STORAGE:default"),
            PathBuf::from("/tmp/x/STORAGE%3Adefault.json")
        );
    }

    #[test]
    fn test_distinct_keys_get_distinct_files() {
        // ---
        let kv = FileKeyValue::new("/tmp/x");
        let keys = ["STORAGE:a", "STORAGE_a", "STORAGE%3Aa", "STORAGE a", "STORAGE:ä"];
        let paths: std::collections::HashSet<PathBuf> =
            keys.iter().map(|k| kv.path_for(k)).collect();
        assert_eq!(paths.len(), keys.len());
    }

    #[tokio::test]
    async fn test_similar_keys_keep_separate_values() {
        // ---
        let kv = FileKeyValue::new(unique_temp_dir());
        kv.set("STORAGE:a", "colon").await.unwrap();
        kv.set("STORAGE_a", "underscore").await.unwrap();

        assert_eq!(kv.get("STORAGE:a").await.unwrap().as_deref(), Some("colon"));
        assert_eq!(kv.get("STORAGE_a").await.unwrap().as_deref(), Some("underscore"));
    }
}
