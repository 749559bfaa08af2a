//! Typed view of the dictionary API payload.
//!
//! The upstream schema is not under our control, so every field except `word`
//! decodes leniently: a missing key, an explicit `null` and a value of the
//! wrong shape all read as empty. Scalars where text is expected are rendered
//! as text, so `"partOfSpeech": 5` reads as `"5"`.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One dictionary result for a queried word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(deserialize_with = "required_text")]
    pub word: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phonetic: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub phonetics: Vec<Phonetic>,
    #[serde(default, deserialize_with = "lenient")]
    pub meanings: Vec<Meaning>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phonetic {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub audio: Option<String>,
}

/// A part-of-speech-tagged group of definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meaning {
    #[serde(
        rename = "partOfSpeech",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub part_of_speech: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub definition: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub example: Option<String>,
    #[serde(default, deserialize_with = "lenient_texts")]
    pub synonyms: Vec<String>,
}

impl Entry {
    /// Entry-level phonetic text, else the first variant that carries text.
    pub fn phonetic_label(&self) -> Option<&str> {
        non_empty(self.phonetic.as_deref()).or_else(|| {
            self.phonetics
                .iter()
                .find_map(|variant| non_empty(variant.text.as_deref()))
        })
    }

    /// Audio URL of the first phonetic variant that has one.
    pub fn audio_src(&self) -> Option<&str> {
        self.phonetics
            .iter()
            .find_map(|variant| non_empty(variant.audio.as_deref()))
    }
}

impl Definition {
    pub fn example(&self) -> Option<&str> {
        non_empty(self.example.as_deref())
    }
}

/// Every distinct synonym across all definitions, in first-seen order.
pub fn distinct_synonyms(meanings: &[Meaning]) -> Vec<&str> {
    let mut seen = HashSet::new();
    meanings
        .iter()
        .flat_map(|meaning| &meaning.definitions)
        .flat_map(|definition| &definition.synonyms)
        .map(String::as_str)
        .filter(|synonym| seen.insert(*synonym))
        .collect()
}

/// Decodes a raw API payload. Anything other than a JSON array is treated as
/// "no entries" rather than an error.
pub fn parse_payload(payload: &Value) -> Result<Vec<Entry>, serde_json::Error> {
    match payload {
        Value::Array(items) => items.iter().map(Entry::deserialize).collect(),
        _ => Ok(Vec::new()),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(text_of)
}

fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_text(deserializer).map(Option::unwrap_or_default)
}

fn lenient_texts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(text_of).collect(),
        _ => Vec::new(),
    })
}

fn required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_text(deserializer)?.ok_or_else(|| D::Error::custom("`word` is not text"))
}
