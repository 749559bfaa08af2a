//! Dictionary lookup widget.
//!
//! A query goes through [`search::Lookup`], which consults the response cache
//! in [`storage::Storage`], falls back to a [`fetch::WordFetcher`], renders the
//! payload with [`render`] and records the term in the search history. The
//! browser front end lives in `widget` (feature `browser`); the terminal front
//! end is the `glosswidget-rs` binary (feature `cli`).

pub mod controls;
pub mod entry;
pub mod escape;
pub mod fetch;
pub mod render;
pub mod search;
pub mod storage;
pub mod theme;

#[cfg(feature = "browser")]
pub mod widget;

pub use controls::Page;
pub use entry::{Definition, Entry, Meaning, Phonetic};
pub use escape::escape_html;
pub use fetch::{FetchError, WordFetcher};
pub use search::{BufferedSurface, Lookup, SearchOutcome, Source, Surface};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Storage, StorageError};
pub use theme::Theme;

/// Base URL of the free dictionary API; the term is appended as a path segment.
pub const DEFAULT_API_BASE: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

/// Number of search terms kept in history.
pub const HISTORY_LIMIT: usize = 10;

/// Settings shared by the browser and terminal front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub api_base: String,
    pub history_limit: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl WidgetConfig {
    /// Wraps `backend` in a [`Storage`] that keeps `history_limit` terms.
    pub fn storage<S: KeyValueStore>(&self, backend: S) -> Storage<S> {
        Storage::with_limit(backend, self.history_limit)
    }
}
