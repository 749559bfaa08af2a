//! HTML fragments for the result and history panels.
//!
//! Every piece of externally sourced text goes through [`escape_html`] on its
//! way into markup; nothing else in the crate builds HTML.

use crate::entry::{Entry, Meaning, distinct_synonyms, parse_payload};
use crate::escape::escape_html;
use serde_json::Value;

pub const NO_RESULTS_MESSAGE: &str = "No results.";

/// Result panel for a decoded response. Only the first entry is shown.
pub fn render_result(entries: &[Entry]) -> String {
    let Some(entry) = entries.first() else {
        return render_message(NO_RESULTS_MESSAGE, false);
    };
    let phonetic = entry
        .phonetic_label()
        .map(|text| format!(r#"<span class="phonetic">{}</span>"#, escape_html(text)))
        .unwrap_or_default();
    let audio = entry
        .audio_src()
        .map(|src| format!(r#"<audio controls src="{}"></audio>"#, escape_html(src)))
        .unwrap_or_default();
    format!(
        r#"<div class="result-header"><div class="word-title"><h2>{word}</h2>{phonetic}</div>{audio}</div><ul class="definitions">{definitions}</ul>{synonyms}"#,
        word = escape_html(&entry.word),
        phonetic = phonetic,
        audio = audio,
        definitions = render_definitions(&entry.meanings),
        synonyms = render_synonyms(&entry.meanings),
    )
}

/// Result panel straight from a raw API payload. A payload that is not a
/// non-empty array renders as "No results."; a malformed entry is an error.
pub fn render_payload(payload: &Value) -> Result<String, serde_json::Error> {
    let entries = parse_payload(payload)?;
    Ok(render_result(&entries))
}

/// One `<li>` per definition, badged with its meaning's part of speech.
pub fn render_definitions(meanings: &[Meaning]) -> String {
    let mut html = String::new();
    for meaning in meanings {
        let badge = escape_html(meaning.part_of_speech.as_deref().unwrap_or_default());
        for definition in &meaning.definitions {
            html.push_str(r#"<li><span class="badge">"#);
            html.push_str(&badge);
            html.push_str("</span> ");
            html.push_str(&escape_html(&definition.definition));
            if let Some(example) = definition.example() {
                html.push_str("<br><em>Example:</em> ");
                html.push_str(&escape_html(example));
            }
            html.push_str("</li>");
        }
    }
    html
}

/// Every distinct synonym across all definitions, or nothing at all.
pub fn render_synonyms(meanings: &[Meaning]) -> String {
    let synonyms: Vec<String> = distinct_synonyms(meanings)
        .into_iter()
        .map(escape_html)
        .collect();
    if synonyms.is_empty() {
        return String::new();
    }
    format!(
        r#"<p class="synonyms"><strong>Synonyms:</strong> {}</p>"#,
        synonyms.join(", ")
    )
}

/// Loading, idle, validation and failure states of the result panel.
pub fn render_message(text: &str, is_error: bool) -> String {
    if is_error {
        format!(r#"<p class="empty-state error">{}</p>"#, escape_html(text))
    } else {
        format!("<p>{}</p>", escape_html(text))
    }
}

pub fn render_history(terms: &[String]) -> String {
    terms
        .iter()
        .map(|term| {
            let term = escape_html(term);
            format!(r#"<button type="button" class="chip" data-term="{term}">{term}</button>"#)
        })
        .collect()
}
