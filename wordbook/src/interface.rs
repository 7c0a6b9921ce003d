//! Wordbook FFI Interface Definition
//!
//! This file defines the public interface exposed to Kotlin/Swift via UniFFI.
//! It acts as the source of truth for shared types.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// One definition of a word sense
#[derive(Debug, Clone, PartialEq, Eq, Default, uniffi::Record)]
pub struct Definition {
    pub definition: String,
    /// Usage example, empty when the dictionary has none
    pub example: String,
}

/// A word sense: part of speech plus its first definition
#[derive(Debug, Clone, PartialEq, Eq, Default, uniffi::Record)]
pub struct Meaning {
    pub part_of_speech: String,
    pub definition: Definition,
}

/// Result of a successful dictionary lookup.
///
/// Opaque to the search coordinator: it is passed through to the UI unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, uniffi::Record)]
pub struct WordItem {
    /// Headword with its first character title-cased
    pub word: String,
    pub phonetic: String,
    /// Pronunciation audio, if the dictionary provides one
    pub audio_url: Option<String>,
    pub meanings: Vec<Meaning>,
}

/// A persisted search-history entry, keyed by `word`
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct HistoryEntry {
    pub word: String,
    /// Unix time in milliseconds of the last confirmed search
    pub last_searched_at: i64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEARCH SCREEN STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Lookup progress as seen by the host UI
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum LookupState {
    Idle,
    Loading,
    Success { item: WordItem },
    Failed { message: String },
}

/// Snapshot of the search screen state
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SearchSnapshot {
    pub query: String,
    pub last_confirmed_query: String,
    pub lookup: LookupState,
    pub lookup_job: u64,
    /// History words in display order
    pub history: Vec<String>,
    pub pending_resort: bool,
    pub pending_delete: Option<String>,
    pub history_error: Option<String>,
}

/// Error type for Wordbook operations
#[derive(Debug, Error, uniffi::Error)]
pub enum WordbookError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Lookup error: {0}")]
    LookupError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Search coordinator is no longer running")]
    CoordinatorClosed,
}

impl From<crate::database::DatabaseError> for WordbookError {
    fn from(e: crate::database::DatabaseError) -> Self {
        WordbookError::DatabaseError(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FREE FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Similarity of a history candidate to the current query (higher is better)
#[uniffi::export]
pub fn word_similarity_score(candidate: String, query: String) -> u32 {
    crate::similarity::similarity_score(&candidate, &query)
}

/// Rank history candidates against the query, best first, ties in input order
#[uniffi::export]
pub fn rank_candidates(candidates: Vec<String>, query: String) -> Vec<String> {
    crate::ranking::rank(&candidates, &query)
}
