//! Browser front end: binds the host document's form, buttons and panels to
//! a [`Lookup`] backed by `window.localStorage`.

use crate::WidgetConfig;
use crate::controls::{self, Page};
use crate::fetch::BrowserFetcher;
use crate::search::{Lookup, Surface};
use crate::storage::{KeyValueStore, StorageError};
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlInputElement, Window};

const LIGHT_CLASS: &str = "light";

/// `window.localStorage`, or nothing when the browser refuses access.
pub struct LocalStorage {
    inner: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open(window: &Window) -> Self {
        let inner = window.local_storage().ok().flatten();
        if inner.is_none() {
            warn!("localStorage unavailable; history and cache will not persist");
        }
        Self { inner }
    }

    /// A store with no backing `localStorage`: reads find nothing and writes fail.
    pub fn unavailable() -> Self {
        Self { inner: None }
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = self.inner.as_ref().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|err| StorageError::Write(format!("{err:?}")))
    }
}

/// Elements the widget reads from the host document.
struct Elements {
    document: Document,
    form: Option<Element>,
    input: HtmlInputElement,
    clear_button: Option<Element>,
    result: Element,
    history: Option<Element>,
    theme_toggle: Option<Element>,
}

impl Elements {
    fn locate(document: Document) -> Option<Self> {
        let input = document
            .get_element_by_id("wordInput")?
            .dyn_into::<HtmlInputElement>()
            .ok()?;
        let result = document.get_element_by_id("result")?;
        Some(Self {
            form: document.get_element_by_id("searchForm"),
            clear_button: document.get_element_by_id("clearBtn"),
            history: document.get_element_by_id("history"),
            theme_toggle: document.get_element_by_id("themeToggle"),
            input,
            result,
            document,
        })
    }
}

impl Surface for Elements {
    fn set_busy(&self, busy: bool) {
        let _ = self
            .result
            .set_attribute("aria-busy", if busy { "true" } else { "false" });
    }

    fn show_result(&self, html: &str) {
        self.result.set_inner_html(html);
    }

    fn show_history(&self, html: &str) {
        if let Some(history) = &self.history {
            history.set_inner_html(html);
        }
    }
}

impl Page for Elements {
    fn input_value(&self) -> String {
        self.input.value()
    }

    fn set_input_value(&self, value: &str) {
        self.input.set_value(value);
    }

    fn focus_input(&self) {
        let _ = self.input.focus();
    }

    fn set_light(&self, light: bool) {
        if let Some(root) = self.document.document_element() {
            let _ = root.class_list().toggle_with_force(LIGHT_CLASS, light);
        }
    }

    fn set_theme_icon(&self, icon: &str) {
        if let Some(toggle) = &self.theme_toggle {
            toggle.set_text_content(Some(icon));
        }
    }
}

struct Widget {
    elements: Elements,
    lookup: Lookup<LocalStorage, BrowserFetcher>,
}

impl Widget {
    fn search(self: &Rc<Self>, term: String) {
        let widget = Rc::clone(self);
        spawn_local(async move {
            widget.lookup.search(&widget.elements, &term).await;
        });
    }

    fn bind(self: &Rc<Self>) -> Result<(), JsValue> {
        if let Some(form) = &self.elements.form {
            let widget = Rc::clone(self);
            listen(form, "submit", move |event| {
                event.prevent_default();
                widget.search(widget.elements.input_value());
            })?;
        }

        if let Some(clear_button) = &self.elements.clear_button {
            let widget = Rc::clone(self);
            listen(clear_button, "click", move |_| controls::clear(&widget.elements))?;
        }

        if let Some(history) = &self.elements.history {
            let widget = Rc::clone(self);
            listen(history, "click", move |event| {
                let Some(chip) = event
                    .target()
                    .and_then(|target| target.dyn_into::<Element>().ok())
                    .filter(|target| target.matches(".chip").unwrap_or(false))
                else {
                    return;
                };
                let term = chip.get_attribute("data-term").unwrap_or_default();
                widget.search(controls::pick_chip(&widget.elements, &term));
            })?;
        }

        if let Some(toggle) = &self.elements.theme_toggle {
            let widget = Rc::clone(self);
            listen(toggle, "click", move |_| {
                controls::toggle_theme(&widget.elements, widget.lookup.storage());
            })?;
        }
        Ok(())
    }

    fn init(self: &Rc<Self>, window: &Window) {
        let fragment = window.location().hash().unwrap_or_default();
        if let Some(term) = controls::start(&self.elements, self.lookup.storage(), &fragment) {
            self.search(term);
        }
    }
}

fn listen<F>(target: &Element, event: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    wasm_logger::init(wasm_logger::Config::default());

    let Some(window) = web_sys::window() else {
        return Ok(());
    };
    let Some(elements) = window.document().and_then(Elements::locate) else {
        warn!("dictionary widget markup not found; nothing to bind");
        return Ok(());
    };

    let config = WidgetConfig::default();
    let storage = config.storage(LocalStorage::open(&window));
    let widget = Rc::new(Widget {
        elements,
        lookup: Lookup::new(storage, BrowserFetcher::new(config.api_base.clone())),
    });
    widget.bind()?;
    widget.init(&window);
    info!("dictionary widget ready");
    Ok(())
}
