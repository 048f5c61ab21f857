//! Durable local key-value storage.
//!
//! Local persistence is a convenience cache, not the source of truth for
//! authenticated users, so the error policy is deliberately blunt: write
//! failures are logged and swallowed, unreadable or corrupt values read as
//! absent. Nothing here returns an error to the caller.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::item::CollectionItem;

/// Synchronous, origin-scoped key-value persistence.
///
/// The on-device analogue of browser local storage: reads and writes are
/// synchronous and infallible from the caller's perspective.
pub trait LocalStore: Send + Sync {
    /// Read the value under `key`, or `None` if absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`. Failures are logged, not returned.
    fn set(&self, key: &str, value: &str);

    /// Delete the value under `key`, if present.
    fn remove(&self, key: &str);
}

/// In-memory store, used in tests and as a fallback when no data directory
/// is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock_entries(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        lock_entries(&self.entries).insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        lock_entries(&self.entries).remove(key);
    }
}

fn lock_entries(
    entries: &Mutex<HashMap<String, String>>,
) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// File-backed store: one JSON file per key under a directory.
///
/// Writes go through a temp file and rename so a crash mid-write cannot
/// leave a truncated value behind.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal (namespace + user id) but user ids are opaque
        // backend strings. Percent-escape anything non-filename-safe; the
        // escape character itself is escaped, so distinct keys can never
        // map to the same file.
        let safe: String = key
            .bytes()
            .map(|b| match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => {
                    char::from(b).to_string()
                }
                other => format!("%{other:02X}"),
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "failed to read local store entry");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let result = std::fs::write(&tmp, value).and_then(|()| std::fs::rename(&tmp, &path));
        if let Err(e) = result {
            warn!(key, path = %path.display(), error = %e, "failed to write local store entry");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "failed to remove local store entry");
            }
        }
    }
}

/// Read the collection items stored under `key`.
///
/// Corrupt JSON is treated as absent per the local-store error policy.
pub fn read_items<T: DeserializeOwned>(
    store: &dyn LocalStore,
    key: &str,
) -> Vec<CollectionItem<T>> {
    let Some(raw) = store.get(key) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(key, error = %e, "corrupt local collection value, treating as absent");
            Vec::new()
        }
    }
}

/// Mirror `items` into the store under `key`.
pub fn write_items<T: Serialize>(store: &dyn LocalStore, key: &str, items: &[CollectionItem<T>]) {
    match serde_json::to_string(items) {
        Ok(json) => store.set(key, &json),
        Err(e) => {
            warn!(key, error = %e, "failed to serialize collection for local mirror");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);

        store.set("k", "v");
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.remove("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_file_store_round_trip_and_key_sanitizing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        // User ids can contain characters that are not filename-safe.
        store.set("eshop_cart_user/42", "[]");
        assert_eq!(store.get("eshop_cart_user/42").as_deref(), Some("[]"));

        store.remove("eshop_cart_user/42");
        assert_eq!(store.get("eshop_cart_user/42"), None);
        // Removing again is a no-op, not an error.
        store.remove("eshop_cart_user/42");
    }

    #[test]
    fn test_file_store_distinct_keys_never_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        // These keys differ only in characters that need escaping.
        store.set("eshop_cart_user a/b", "slash");
        store.set("eshop_cart_user a-b", "dash");
        store.set("eshop_cart_user a%b", "percent");

        assert_eq!(store.get("eshop_cart_user a/b").as_deref(), Some("slash"));
        assert_eq!(store.get("eshop_cart_user a-b").as_deref(), Some("dash"));
        assert_eq!(store.get("eshop_cart_user a%b").as_deref(), Some("percent"));
    }

    #[test]
    fn test_corrupt_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("eshop_cart", "not json at all {{{");

        let items: Vec<CollectionItem<Note>> = read_items(&store, "eshop_cart");
        assert!(items.is_empty());
    }

    #[test]
    fn test_items_round_trip() {
        let store = MemoryStore::new();
        let items = vec![CollectionItem {
            id: "n1".to_owned(),
            payload: Note {
                text: "hello".to_owned(),
            },
        }];

        write_items(&store, "notes", &items);
        let back: Vec<CollectionItem<Note>> = read_items(&store, "notes");
        assert_eq!(back, items);
    }
}
