//! Page controls around a search: theme switch, clear button, history chips
//! and start-up. Written against [`Page`] so any front end with an input box
//! can drive them.

use crate::render::{render_history, render_message};
use crate::search::{IDLE_MESSAGE, Surface, term_from_fragment};
use crate::storage::{KeyValueStore, Storage};
use crate::theme::Theme;

/// A [`Surface`] that also owns the search input and the theme affordances.
pub trait Page: Surface {
    fn input_value(&self) -> String;
    fn set_input_value(&self, value: &str);
    fn focus_input(&self);
    /// Adds or removes the `light` class on the document root.
    fn set_light(&self, light: bool);
    fn set_theme_icon(&self, icon: &str);
}

pub fn apply_theme<P: Page + ?Sized>(page: &P, theme: Theme) {
    page.set_light(theme.is_light());
    page.set_theme_icon(theme.icon());
}

/// Persists the opposite theme and shows it.
pub fn toggle_theme<P, S>(page: &P, storage: &Storage<S>) -> Theme
where
    P: Page + ?Sized,
    S: KeyValueStore,
{
    let theme = storage.toggle_theme();
    apply_theme(page, theme);
    theme
}

pub fn clear<P: Page + ?Sized>(page: &P) {
    page.set_input_value("");
    page.focus_input();
    page.show_result("");
}

/// Copies a history chip's term into the input and returns it for searching.
pub fn pick_chip<P: Page + ?Sized>(page: &P, term: &str) -> String {
    page.set_input_value(term);
    term.to_string()
}

/// Applies the stored theme and history chips. Returns the fragment term, already
/// placed in the input, when the page should search at once; otherwise the
/// idle prompt is shown.
pub fn start<P, S>(page: &P, storage: &Storage<S>, fragment: &str) -> Option<String>
where
    P: Page + ?Sized,
    S: KeyValueStore,
{
    apply_theme(page, storage.theme());
    page.show_history(&render_history(&storage.history()));
    match term_from_fragment(fragment) {
        Some(term) => {
            page.set_input_value(&term);
            Some(term)
        }
        None => {
            page.show_result(&render_message(IDLE_MESSAGE, false));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, WordFetcher};
    use crate::search::{BufferedSurface, Lookup, SearchOutcome};
    use crate::storage::MemoryStore;
    use serde_json::{Value, json};

    struct OneWord;

    impl WordFetcher for OneWord {
        async fn fetch_word(&self, term: &str) -> Result<Value, FetchError> {
            Ok(json!([{ "word": term }]))
        }
    }

    #[test]
    fn toggle_flips_root_class_icon_and_stored_theme() {
        let storage = Storage::new(MemoryStore::new());
        let page = BufferedSurface::new();
        apply_theme(&page, storage.theme());
        assert!(!page.is_light());
        assert_eq!(page.theme_icon(), "🌙");

        assert_eq!(toggle_theme(&page, &storage), Theme::Light);
        assert!(page.is_light());
        assert_eq!(page.theme_icon(), "🌞");
        assert_eq!(storage.theme(), Theme::Light);

        assert_eq!(toggle_theme(&page, &storage), Theme::Dark);
        assert!(!page.is_light());
        assert_eq!(page.theme_icon(), "🌙");
    }

    #[test]
    fn clear_empties_input_and_result() {
        let page = BufferedSurface::new();
        page.set_input_value("hello");
        page.show_result("<p>old</p>");
        clear(&page);
        assert_eq!(page.input_value(), "");
        assert_eq!(page.result_html(), "");
        assert!(page.input_focused());
    }

    #[tokio::test]
    async fn chip_fills_input_and_searches() {
        let lookup = Lookup::new(Storage::new(MemoryStore::new()), OneWord);
        let page = BufferedSurface::new();

        let term = pick_chip(&page, "Ice cream");
        let outcome = lookup.search(&page, &term).await;

        assert_eq!(page.input_value(), "Ice cream");
        assert!(matches!(outcome, SearchOutcome::Found { term, .. } if term == "Ice cream"));
        assert!(page.result_html().contains("<h2>Ice cream</h2>"));
        assert!(page.history_html().contains(r#"data-term="Ice cream""#));
    }

    #[test]
    fn start_restores_theme_history_and_fragment_term() {
        let storage = Storage::new(MemoryStore::new());
        storage.set_theme(Theme::Light);
        storage.set_history(&["word".to_string()]);
        let page = BufferedSurface::new();

        let term = start(&page, &storage, "#ice%20cream");

        assert_eq!(term.as_deref(), Some("ice cream"));
        assert_eq!(page.input_value(), "ice cream");
        assert!(page.is_light());
        assert!(page.history_html().contains(r#"data-term="word""#));
    }

    #[test]
    fn start_without_fragment_shows_idle_prompt() {
        let storage = Storage::new(MemoryStore::new());
        let page = BufferedSurface::new();

        assert_eq!(start(&page, &storage, ""), None);
        assert_eq!(page.result_html(), format!("<p>{IDLE_MESSAGE}</p>"));
        assert_eq!(page.input_value(), "");
        assert_eq!(page.theme_icon(), "🌙");
    }
}
