//! Core data models for Wordbook
//!
//! Record types live in `interface` so UniFFI exports them; this module adds the
//! internal helpers around them.

use crate::interface::HistoryEntry;

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl HistoryEntry {
    pub fn new(word: impl Into<String>, last_searched_at: i64) -> Self {
        Self {
            word: word.into(),
            last_searched_at,
        }
    }

    /// Entry for a search confirmed right now
    pub fn searched_now(word: impl Into<String>) -> Self {
        Self::new(word, now_millis())
    }
}

/// Project entries to their words, keeping order
pub fn entry_words(entries: Vec<HistoryEntry>) -> Vec<String> {
    entries.into_iter().map(|e| e.word).collect()
}
