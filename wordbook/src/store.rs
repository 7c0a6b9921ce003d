//! History store collaborator and its implementations.
//!
//! The coordinator talks to history through the [`HistoryStore`] trait:
//! upsert, insert-if-absent, delete, clear, and two listings (insertion order and
//! most-recent-first). [`SqliteHistoryStore`] is the persistent implementation and is
//! also exported to the host app via UniFFI; [`InMemoryHistoryStore`] backs tests and
//! throwaway sessions.
//!
//! Blocking SQLite work runs on `spawn_blocking` threads of the current tokio runtime,
//! or of a global fallback runtime when called from outside any runtime (e.g. from
//! UniFFI, which doesn't provide one).

use crate::database::Database;
use crate::interface::{HistoryEntry, WordbookError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Global fallback Tokio runtime for when async functions are called outside any runtime context.
/// Shared across all stores and coordinators and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("wordbook-runtime")
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
pub(crate) fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// Persisted search history, keyed by word.
///
/// Each write is atomic from the caller's perspective. Listing order of
/// [`HistoryStore::list_all`] carries no meaning for ranking; callers re-sort.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert the entry, or update the timestamp of an existing word
    async fn upsert(&self, entry: HistoryEntry) -> Result<(), WordbookError>;

    /// Insert the entry only if its word is absent. Returns whether it was inserted.
    async fn insert_if_absent(&self, entry: HistoryEntry) -> Result<bool, WordbookError>;

    /// Remove a word. Returns whether it existed.
    async fn delete(&self, word: String) -> Result<bool, WordbookError>;

    /// Remove every entry. Returns the number removed.
    async fn clear(&self) -> Result<u64, WordbookError>;

    /// All entries, in no particular order
    async fn list_all(&self) -> Result<Vec<HistoryEntry>, WordbookError>;

    /// All entries, most recently searched first
    async fn list_by_recency(&self) -> Result<Vec<HistoryEntry>, WordbookError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite
// ─────────────────────────────────────────────────────────────────────────────

/// Thread-safe history store backed by SQLite
///
/// Concurrency Model:
/// - Database uses an r2d2 connection pool (concurrent reads, no mutex blocking)
/// - Async trait methods run their queries on spawn_blocking threads
/// - FFI methods are synchronous and run on the caller's thread
#[derive(uniffi::Object)]
pub struct SqliteHistoryStore {
    db: Arc<Database>,
}

impl SqliteHistoryStore {
    /// Create a store with an in-memory database
    pub fn new_in_memory() -> Result<Self, WordbookError> {
        let db = Database::open_in_memory()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Run a blocking database call off the async executor
    async fn with_db<T, F>(&self, f: F) -> Result<T, WordbookError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, WordbookError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        match runtime_handle().spawn_blocking(move || f(&*db)).await {
            Ok(result) => result,
            // JoinError means the task panicked or the runtime is shutting down
            Err(_join_error) => Err(WordbookError::Cancelled),
        }
    }
}

// FFI-exported constructor (must be in standalone impl block)
#[uniffi::export]
impl SqliteHistoryStore {
    /// Create a new store with a database at the given path
    #[uniffi::constructor]
    pub fn new(db_path: String) -> Result<Self, WordbookError> {
        let path = PathBuf::from(db_path);
        let db = Database::open(&path)?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[uniffi::export]
impl SqliteHistoryStore {
    /// Record a confirmed search of `word` now
    pub fn record_search(&self, word: String) -> Result<(), WordbookError> {
        let word = validate_word(word)?;
        self.db.upsert_entry(&HistoryEntry::searched_now(word))?;
        Ok(())
    }

    /// Delete a word from history. Returns whether it existed.
    pub fn delete_word(&self, word: String) -> Result<bool, WordbookError> {
        Ok(self.db.delete_entry(&word)?)
    }

    /// Clear all history. Returns the number of deleted entries.
    pub fn clear_history(&self) -> Result<u64, WordbookError> {
        Ok(self.db.clear_all()?)
    }

    /// History entries, most recently searched first
    pub fn recent_entries(&self) -> Result<Vec<HistoryEntry>, WordbookError> {
        Ok(self.db.fetch_by_recency()?)
    }

    /// Number of stored entries
    pub fn entry_count(&self) -> Result<u64, WordbookError> {
        Ok(self.db.count_entries()?)
    }

    /// Get the database size in bytes
    pub fn database_size(&self) -> i64 {
        self.db.database_size().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn upsert(&self, entry: HistoryEntry) -> Result<(), WordbookError> {
        self.with_db(move |db| Ok(db.upsert_entry(&entry)?)).await
    }

    async fn insert_if_absent(&self, entry: HistoryEntry) -> Result<bool, WordbookError> {
        self.with_db(move |db| Ok(db.insert_if_absent(&entry)?)).await
    }

    async fn delete(&self, word: String) -> Result<bool, WordbookError> {
        self.with_db(move |db| Ok(db.delete_entry(&word)?)).await
    }

    async fn clear(&self) -> Result<u64, WordbookError> {
        self.with_db(|db| Ok(db.clear_all()?)).await
    }

    async fn list_all(&self) -> Result<Vec<HistoryEntry>, WordbookError> {
        self.with_db(|db| Ok(db.fetch_all()?)).await
    }

    async fn list_by_recency(&self) -> Result<Vec<HistoryEntry>, WordbookError> {
        self.with_db(|db| Ok(db.fetch_by_recency()?)).await
    }
}

/// Reject words that would make meaningless history keys
fn validate_word(word: String) -> Result<String, WordbookError> {
    if word.trim().is_empty() {
        return Err(WordbookError::InvalidInput("Empty word".into()));
    }
    Ok(word)
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// History store kept in process memory, in insertion order
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`, later duplicates overriding earlier ones
    pub fn with_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.entries.lock();
            for entry in entries {
                upsert_in_place(&mut guard, entry);
            }
        }
        store
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.lock().clone()
    }
}

fn upsert_in_place(entries: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    match entries.iter_mut().find(|e| e.word == entry.word) {
        Some(existing) => existing.last_searched_at = entry.last_searched_at,
        None => entries.push(entry),
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn upsert(&self, entry: HistoryEntry) -> Result<(), WordbookError> {
        upsert_in_place(&mut self.entries.lock(), entry);
        Ok(())
    }

    async fn insert_if_absent(&self, entry: HistoryEntry) -> Result<bool, WordbookError> {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.word == entry.word) {
            return Ok(false);
        }
        entries.push(entry);
        Ok(true)
    }

    async fn delete(&self, word: String) -> Result<bool, WordbookError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.word != word);
        Ok(entries.len() != before)
    }

    async fn clear(&self) -> Result<u64, WordbookError> {
        let mut entries = self.entries.lock();
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn list_all(&self) -> Result<Vec<HistoryEntry>, WordbookError> {
        Ok(self.snapshot())
    }

    async fn list_by_recency(&self) -> Result<Vec<HistoryEntry>, WordbookError> {
        let mut entries = self.snapshot();
        // Stable: among equal timestamps, later insertions come first
        entries.reverse();
        entries.sort_by(|a, b| b.last_searched_at.cmp(&a.last_searched_at));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn words(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.word.as_str()).collect()
    }

    #[test]
    fn test_store_creation() {
        let store = SqliteHistoryStore::new_in_memory().unwrap();
        assert!(store.database_size() > 0);
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_ffi_record_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.db").to_string_lossy().to_string();
        let store = SqliteHistoryStore::new(path).unwrap();

        store.record_search("Hello".to_string()).unwrap();
        store.record_search("Doggo".to_string()).unwrap();
        store.record_search("Hello".to_string()).unwrap();
        assert_eq!(store.entry_count().unwrap(), 2);
        assert_eq!(store.recent_entries().unwrap()[0].word, "Hello");

        assert!(store.delete_word("Hello".to_string()).unwrap());
        assert_eq!(words(&store.recent_entries().unwrap()), vec!["Doggo"]);

        assert_eq!(store.clear_history().unwrap(), 1);
    }

    #[test]
    fn test_ffi_rejects_blank_word() {
        let store = SqliteHistoryStore::new_in_memory().unwrap();
        let result = store.record_search("   ".to_string());
        assert!(matches!(result, Err(WordbookError::InvalidInput(_))));
    }

    #[test]
    fn test_async_api_outside_runtime_uses_fallback() {
        // No runtime on this thread: spawn_blocking goes to the fallback runtime
        let store = SqliteHistoryStore::new_in_memory().unwrap();
        futures::executor::block_on(async {
            store.upsert(HistoryEntry::new("Beep", 1)).await.unwrap();
        });
        assert_eq!(store.entry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_store_trait() {
        let store = SqliteHistoryStore::new_in_memory().unwrap();

        store.upsert(HistoryEntry::new("Welcome", 1)).await.unwrap();
        assert!(!store.insert_if_absent(HistoryEntry::new("Welcome", 50)).await.unwrap());
        assert!(store.insert_if_absent(HistoryEntry::new("Foo", 2)).await.unwrap());
        store.upsert(HistoryEntry::new("Beep", 3)).await.unwrap();

        assert_eq!(words(&store.list_all().await.unwrap()), vec!["Welcome", "Foo", "Beep"]);
        assert_eq!(words(&store.list_by_recency().await.unwrap()), vec!["Beep", "Foo", "Welcome"]);

        assert!(store.delete("Foo".to_string()).await.unwrap());
        assert!(!store.delete("Foo".to_string()).await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_store_matches_sqlite_semantics() {
        let store = InMemoryHistoryStore::with_entries([
            HistoryEntry::new("Welcome", 1),
            HistoryEntry::new("Foo", 2),
        ]);

        store.upsert(HistoryEntry::new("Welcome", 10)).await.unwrap();
        assert!(!store.insert_if_absent(HistoryEntry::new("Foo", 99)).await.unwrap());
        store.upsert(HistoryEntry::new("Beep", 5)).await.unwrap();

        assert_eq!(words(&store.list_all().await.unwrap()), vec!["Welcome", "Foo", "Beep"]);
        assert_eq!(words(&store.list_by_recency().await.unwrap()), vec!["Welcome", "Beep", "Foo"]);

        assert!(store.delete("Foo".to_string()).await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_recency_ties_prefer_later_insertions() {
        let store = InMemoryHistoryStore::with_entries([
            HistoryEntry::new("first", 7),
            HistoryEntry::new("second", 7),
        ]);
        assert_eq!(words(&store.list_by_recency().await.unwrap()), vec!["second", "first"]);
    }
}
