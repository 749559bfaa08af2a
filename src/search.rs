//! Search orchestration: cache, fetch, render, history and busy state for a
//! single query.

use crate::controls::Page;
use crate::fetch::{FetchError, WordFetcher};
use crate::render::{render_history, render_message, render_payload};
use crate::storage::{KeyValueStore, Storage};
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a word.";
pub const LOADING_MESSAGE: &str = "Loading...";
pub const IDLE_MESSAGE: &str = "Type a word and press Enter to search.";
const FALLBACK_FAILURE_MESSAGE: &str = "Something went wrong";
const MALFORMED_RESPONSE_MESSAGE: &str = "The dictionary sent an entry that could not be read.";

/// The parts of the page a search writes to.
pub trait Surface {
    fn set_busy(&self, busy: bool);
    fn show_result(&self, html: &str);
    fn show_history(&self, html: &str);
}

/// Where a successful payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Cache => write!(f, "cache"),
            Source::Network => write!(f, "network"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The query was blank after trimming.
    Rejected,
    Found {
        term: String,
        source: Source,
        payload: Value,
    },
    Failed {
        term: String,
        message: String,
    },
}

#[derive(Debug)]
enum SearchError {
    Fetch(FetchError),
    Render(serde_json::Error),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Fetch(err) => write!(f, "{err}"),
            SearchError::Render(_) => f.write_str(MALFORMED_RESPONSE_MESSAGE),
        }
    }
}

impl From<FetchError> for SearchError {
    fn from(value: FetchError) -> Self {
        SearchError::Fetch(value)
    }
}

/// Clears the busy flag however the search ends, including when its future is
/// dropped before completion.
struct BusyGuard<'a, V: Surface + ?Sized> {
    surface: &'a V,
}

impl<'a, V: Surface + ?Sized> BusyGuard<'a, V> {
    fn engage(surface: &'a V) -> Self {
        surface.set_busy(true);
        Self { surface }
    }
}

impl<V: Surface + ?Sized> Drop for BusyGuard<'_, V> {
    fn drop(&mut self) {
        self.surface.set_busy(false);
    }
}

pub struct Lookup<S, F> {
    storage: Storage<S>,
    fetcher: F,
}

impl<S: KeyValueStore, F: WordFetcher> Lookup<S, F> {
    pub fn new(storage: Storage<S>, fetcher: F) -> Self {
        Self { storage, fetcher }
    }

    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    /// Runs one search. Takes `&self` so a second search may start while the
    /// first is still waiting on the network; whichever finishes last owns the
    /// result panel.
    pub async fn search<V: Surface + ?Sized>(&self, surface: &V, raw: &str) -> SearchOutcome {
        let term = raw.trim();
        if term.is_empty() {
            surface.show_result(&render_message(EMPTY_QUERY_MESSAGE, true));
            return SearchOutcome::Rejected;
        }

        let _busy = BusyGuard::engage(surface);
        surface.show_result(&render_message(LOADING_MESSAGE, false));

        match self.resolve(term).await {
            Ok((payload, source, html)) => {
                surface.show_result(&html);
                let history = self.storage.push_history(term);
                surface.show_history(&render_history(&history));
                info!(term, %source, "search completed");
                SearchOutcome::Found {
                    term: term.to_string(),
                    source,
                    payload,
                }
            }
            Err(err) => {
                if let SearchError::Render(cause) = &err {
                    warn!(term, error = %cause, "undecodable dictionary entry");
                }
                let mut message = err.to_string();
                if message.is_empty() {
                    message = FALLBACK_FAILURE_MESSAGE.to_string();
                }
                warn!(term, error = %message, "search failed");
                surface.show_result(&render_message(&message, true));
                SearchOutcome::Failed {
                    term: term.to_string(),
                    message,
                }
            }
        }
    }

    /// Cache first, then network. Only payloads that render are cached, so an
    /// unreadable response is fetched again next time.
    async fn resolve(&self, term: &str) -> Result<(Value, Source, String), SearchError> {
        if let Some(payload) = self.storage.cached(term) {
            debug!(term, "cache hit");
            let html = render_payload(&payload).map_err(SearchError::Render)?;
            return Ok((payload, Source::Cache, html));
        }
        let payload = self.fetcher.fetch_word(term).await?;
        let html = render_payload(&payload).map_err(SearchError::Render)?;
        self.storage.remember(term, &payload);
        Ok((payload, Source::Network, html))
    }
}

/// Page that keeps the latest writes in memory, for front ends without a DOM.
#[derive(Debug, Default)]
pub struct BufferedSurface {
    state: Mutex<BufferedState>,
}

#[derive(Debug, Default, Clone)]
struct BufferedState {
    busy: bool,
    busy_transitions: Vec<bool>,
    result: String,
    history: String,
    input: String,
    input_focused: bool,
    light: bool,
    theme_icon: String,
}

impl BufferedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// Every value passed to `set_busy`, in order.
    pub fn busy_transitions(&self) -> Vec<bool> {
        self.state.lock().busy_transitions.clone()
    }

    pub fn result_html(&self) -> String {
        self.state.lock().result.clone()
    }

    pub fn history_html(&self) -> String {
        self.state.lock().history.clone()
    }

    pub fn is_light(&self) -> bool {
        self.state.lock().light
    }

    pub fn theme_icon(&self) -> String {
        self.state.lock().theme_icon.clone()
    }

    pub fn input_focused(&self) -> bool {
        self.state.lock().input_focused
    }
}

impl Surface for BufferedSurface {
    fn set_busy(&self, busy: bool) {
        let mut state = self.state.lock();
        state.busy = busy;
        state.busy_transitions.push(busy);
    }

    fn show_result(&self, html: &str) {
        self.state.lock().result = html.to_string();
    }

    fn show_history(&self, html: &str) {
        self.state.lock().history = html.to_string();
    }
}

impl Page for BufferedSurface {
    fn input_value(&self) -> String {
        self.state.lock().input.clone()
    }

    fn set_input_value(&self, value: &str) {
        self.state.lock().input = value.to_string();
    }

    fn focus_input(&self) {
        self.state.lock().input_focused = true;
    }

    fn set_light(&self, light: bool) {
        self.state.lock().light = light;
    }

    fn set_theme_icon(&self, icon: &str) {
        self.state.lock().theme_icon = icon.to_string();
    }
}

/// Search term carried in a URL fragment such as `#ice%20cream`. Any
/// non-empty fragment counts, even one that decodes to whitespace; the search
/// itself rejects blank terms.
pub fn term_from_fragment(fragment: &str) -> Option<String> {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);
    if raw.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(decoded)
}
