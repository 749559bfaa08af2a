//! Typed slots over an opaque string key-value store.
//!
//! Every accessor reads or writes the whole slot. Corrupt slots read as empty
//! and failed writes are logged and dropped; neither ever reaches the user.

use crate::HISTORY_LIMIT;
use crate::theme::Theme;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

const THEME_KEY: &str = "theme";
const HISTORY_KEY: &str = "history";
const CACHE_KEY: &str = "cache";

/// Lowercased term to raw API payload.
pub type ResponseCache = BTreeMap<String, Value>;

#[derive(Debug)]
pub enum StorageError {
    Unavailable,
    Write(String),
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "storage is unavailable"),
            StorageError::Write(reason) => write!(f, "storage write rejected: {reason}"),
            StorageError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

/// Synchronous string store, the shape of `window.localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local store, used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys kept in a single JSON object file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is an empty store and a file holding bad JSON is
    /// replaced on the next write. Any other read failure is an error, so a
    /// write never clobbers a file that could not be read.
    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "ignoring unreadable store file");
            HashMap::new()
        }))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "store file could not be read");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body =
            serde_json::to_string(&entries).map_err(|err| StorageError::Write(err.to_string()))?;
        fs::write(&self.path, body)?;
        Ok(())
    }
}

/// Theme, history and cache slots over a backing store.
pub struct Storage<S> {
    backend: S,
    history_limit: usize,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(backend: S) -> Self {
        Self::with_limit(backend, HISTORY_LIMIT)
    }

    pub fn with_limit(backend: S, history_limit: usize) -> Self {
        Self {
            backend,
            history_limit,
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn theme(&self) -> Theme {
        Theme::from_stored(self.backend.get(THEME_KEY).as_deref())
    }

    pub fn set_theme(&self, theme: Theme) {
        self.write_raw(THEME_KEY, theme.as_str());
    }

    /// Flips the stored theme and returns the new one.
    pub fn toggle_theme(&self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next);
        next
    }

    pub fn history(&self) -> Vec<String> {
        self.read_json(HISTORY_KEY)
    }

    pub fn set_history(&self, terms: &[String]) {
        let kept = &terms[..terms.len().min(self.history_limit)];
        self.write_json(HISTORY_KEY, kept);
    }

    /// Moves `term` to the front, dropping any case-insensitive duplicate.
    pub fn push_history(&self, term: &str) -> Vec<String> {
        let needle = term.to_lowercase();
        let mut terms = self.history();
        terms.retain(|existing| existing.to_lowercase() != needle);
        terms.insert(0, term.to_string());
        terms.truncate(self.history_limit);
        self.set_history(&terms);
        terms
    }

    pub fn cache(&self) -> ResponseCache {
        self.read_json(CACHE_KEY)
    }

    pub fn set_cache(&self, cache: &ResponseCache) {
        self.write_json(CACHE_KEY, cache);
    }

    pub fn cached(&self, term: &str) -> Option<Value> {
        self.cache().remove(&term.to_lowercase())
    }

    pub fn remember(&self, term: &str, payload: &Value) {
        let mut cache = self.cache();
        cache.insert(term.to_lowercase(), payload.clone());
        self.set_cache(&cache);
    }

    fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.backend.get(key) else {
            return T::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            debug!(key, error = %err, "discarding corrupt storage slot");
            T::default()
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.write_raw(key, &raw),
            Err(err) => warn!(key, error = %err, "failed to serialize storage slot"),
        }
    }

    fn write_raw(&self, key: &str, value: &str) {
        if let Err(err) = self.backend.set(key, value) {
            warn!(key, error = %err, "storage write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;

    struct FullStore;

    impl KeyValueStore for FullStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Write("quota exceeded".into()))
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("glosswidget-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn theme_defaults_to_dark_and_toggles() {
        let storage = Storage::new(MemoryStore::new());
        assert_eq!(storage.theme(), Theme::Dark);
        assert_eq!(storage.toggle_theme(), Theme::Light);
        assert_eq!(storage.backend().get("theme").as_deref(), Some("light"));
        assert_eq!(storage.toggle_theme(), Theme::Dark);
        assert_eq!(storage.backend().get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_slots_read_as_empty() {
        let store = MemoryStore::new();
        store.set("history", "not json").unwrap();
        store.set("cache", "[1, 2").unwrap();
        store.set("theme", "purple").unwrap();
        let storage = Storage::new(store);
        assert!(storage.history().is_empty());
        assert!(storage.cache().is_empty());
        assert_eq!(storage.theme(), Theme::Dark);
    }

    #[test]
    fn set_history_keeps_first_ten() {
        let storage = Storage::new(MemoryStore::new());
        let terms: Vec<String> = (0..15).map(|i| format!("word{i}")).collect();
        storage.set_history(&terms);
        let stored = storage.history();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[0], "word0");
        assert_eq!(stored[9], "word9");
    }

    #[test]
    fn push_history_moves_duplicates_to_front() {
        let storage = Storage::new(MemoryStore::new());
        storage.push_history("apple");
        storage.push_history("Banana");
        let terms = storage.push_history("APPLE");
        assert_eq!(terms, vec!["APPLE".to_string(), "Banana".to_string()]);
        assert_eq!(storage.history(), terms);
    }

    #[test]
    fn cache_keys_are_lowercased() {
        let storage = Storage::new(MemoryStore::new());
        let payload = json!([{ "word": "hello" }]);
        storage.remember("HeLLo", &payload);
        assert!(storage.cache().contains_key("hello"));
        assert_eq!(storage.cached("HELLO"), Some(payload));
        assert_eq!(storage.cached("world"), None);
    }

    #[test]
    fn failed_writes_are_swallowed() {
        let storage = Storage::new(FullStore);
        storage.remember("hello", &json!([]));
        assert_eq!(storage.push_history("hello").len(), 1);
        assert!(storage.history().is_empty());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let path = temp_path("persist");
        let _ = fs::remove_file(&path);
        {
            let storage = Storage::new(FileStore::new(&path));
            storage.set_theme(Theme::Light);
            storage.push_history("lexicon");
        }
        let storage = Storage::new(FileStore::new(&path));
        assert_eq!(storage.theme(), Theme::Light);
        assert_eq!(storage.history(), vec!["lexicon".to_string()]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_store_tolerates_corrupt_file() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ nope").unwrap();
        let store = FileStore::new(&path);
        assert_eq!(store.get("theme"), None);
        store.set("theme", "light").unwrap();
        assert_eq!(store.get("theme").as_deref(), Some("light"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_store_refuses_to_overwrite_an_unreadable_file() {
        let path = temp_path("binary");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x7b]).unwrap();
        let store = FileStore::new(&path);
        assert_eq!(store.get("theme"), None);
        assert!(matches!(store.set("theme", "light"), Err(StorageError::Io(_))));
        assert_eq!(fs::read(&path).unwrap(), vec![0xff, 0xfe, 0x00, 0x7b]);

        let storage = Storage::new(FileStore::new(&path));
        storage.set_theme(Theme::Light);
        assert_eq!(storage.theme(), Theme::Dark);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_store_treats_missing_file_as_empty() {
        let path = std::env::temp_dir()
            .join(format!("glosswidget-{}-nested", std::process::id()))
            .join("store.json");
        let _ = fs::remove_dir_all(path.parent().unwrap());
        let store = FileStore::new(&path);
        assert_eq!(store.get("history"), None);
        store.set("history", "[]").unwrap();
        assert_eq!(store.get("history").as_deref(), Some("[]"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    proptest! {
        #[test]
        fn history_stays_bounded_and_unique(terms in prop::collection::vec("[a-cA-C]{1,2}", 0..40)) {
            let storage = Storage::new(MemoryStore::new());
            for term in &terms {
                let history = storage.push_history(term);
                prop_assert!(history.len() <= HISTORY_LIMIT);
                prop_assert_eq!(&history[0], term);
                let lowered: HashSet<String> = history.iter().map(|t| t.to_lowercase()).collect();
                prop_assert_eq!(lowered.len(), history.len());
            }
        }
    }
}
