//! Dictionary lookup collaborator.
//!
//! A lookup is an asynchronous stream of [`LookupEvent`]s: `Loading`, then one
//! terminal `Success` or `Error`. The coordinator treats the [`WordItem`] payload as
//! opaque. Every failure (transport, HTTP status, malformed body, no entries) is
//! normalized to `Error(message)`; there are no retries here.
//!
//! [`FreeDictionaryClient`] implements the lookup against the public dictionary API
//! (`GET {base}{word}` returning a JSON array of entries).

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;

use crate::interface::{Definition, Meaning, WordItem, WordbookError};

/// Message shown for every failed lookup
pub const WORD_NOT_FOUND_MESSAGE: &str = "Couldn't find this word";

/// Progress of a single dictionary lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    Loading,
    Success(WordItem),
    Error(String),
}

pub type LookupStream = BoxStream<'static, LookupEvent>;

/// Source of dictionary entries. Timeout policy belongs to the implementation.
pub trait DictionaryLookup: Send + Sync {
    /// Start looking up `word`. Dropping the stream abandons the lookup.
    fn lookup(&self, word: String) -> LookupStream;
}

// ─────────────────────────────────────────────────────────────────────────────
// Response DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
struct WordItemDto {
    word: Option<String>,
    phonetic: Option<String>,
    phonetics: Option<Vec<PhoneticDto>>,
    meanings: Option<Vec<MeaningDto>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PhoneticDto {
    text: Option<String>,
    audio: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeaningDto {
    part_of_speech: Option<String>,
    definitions: Option<Vec<DefinitionDto>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DefinitionDto {
    definition: Option<String>,
    example: Option<String>,
}

impl WordItemDto {
    fn into_word_item(self) -> WordItem {
        let phonetics = self.phonetics.unwrap_or_default();

        let phonetic = self.phonetic.unwrap_or_else(|| {
            phonetics
                .iter()
                .find_map(|p| p.text.clone())
                .unwrap_or_default()
        });

        let audio_url = phonetics
            .iter()
            .filter_map(|p| p.audio.as_deref())
            .find(|a| !a.is_empty())
            .map(str::to_string);

        WordItem {
            word: self.word.as_deref().map(capitalize_first).unwrap_or_default(),
            phonetic,
            audio_url,
            meanings: self
                .meanings
                .unwrap_or_default()
                .into_iter()
                .map(MeaningDto::into_meaning)
                .collect(),
        }
    }
}

impl MeaningDto {
    /// Only the first definition of each sense is kept
    fn into_meaning(self) -> Meaning {
        let first = self
            .definitions
            .and_then(|defs| defs.into_iter().next())
            .unwrap_or_default();
        Meaning {
            part_of_speech: self.part_of_speech.unwrap_or_default(),
            definition: Definition {
                definition: first.definition.unwrap_or_default(),
                example: first.example.unwrap_or_default(),
            },
        }
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Map a dictionary response body to the first entry it contains
pub fn parse_word_response(body: &str) -> Result<WordItem, WordbookError> {
    let entries: Vec<WordItemDto> = serde_json::from_str(body)
        .map_err(|e| WordbookError::LookupError(format!("Malformed response: {e}")))?;
    entries
        .into_iter()
        .next()
        .map(WordItemDto::into_word_item)
        .ok_or_else(|| WordbookError::LookupError(WORD_NOT_FOUND_MESSAGE.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP lookup against a dictionary API returning entry arrays
#[derive(Debug, Clone)]
pub struct FreeDictionaryClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl FreeDictionaryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WordbookError> {
        let mut base_url = reqwest::Url::parse(base_url)
            .map_err(|e| WordbookError::Config(format!("Invalid API base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(WordbookError::Config(format!(
                "API base URL cannot carry a path: {base_url}"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WordbookError::LookupError(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    /// URL for one word; the word is percent-encoded as a single path segment
    fn word_url(&self, word: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(word);
        }
        url
    }

    /// Fetch and map the first dictionary entry for `word`
    pub async fn fetch(&self, word: &str) -> Result<WordItem, WordbookError> {
        let response = self
            .http
            .get(self.word_url(word))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WordbookError::LookupError(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| WordbookError::LookupError(e.to_string()))?;

        parse_word_response(&body)
    }
}

impl DictionaryLookup for FreeDictionaryClient {
    fn lookup(&self, word: String) -> LookupStream {
        let client = self.clone();
        let result = stream::once(async move {
            match client.fetch(&word).await {
                Ok(item) => LookupEvent::Success(item),
                Err(e) => {
                    tracing::warn!(word = %word, error = %e, "dictionary lookup failed");
                    LookupEvent::Error(WORD_NOT_FOUND_MESSAGE.to_string())
                }
            }
        });
        stream::once(async { LookupEvent::Loading }).chain(result).boxed()
    }
}
