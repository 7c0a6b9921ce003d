//! SQLite database layer for search-history storage
//!
//! One table, `search_history`, keyed by the searched word.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::interface::HistoryEntry;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Thread-safe database wrapper using connection pooling
///
/// WAL mode lets readers proceed without blocking each other. Every write is a
/// single statement, so each upsert or delete is atomic.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA busy_timeout=5000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and throwaway sessions)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory needs a single, never-recycled connection to maintain state
        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;

        // Databases exported from the Android app use Room's column name.
        let has_room_schema = conn
            .prepare("SELECT searchedWord FROM search_history LIMIT 0")
            .is_ok();
        if has_room_schema {
            return Self::migrate_from_room_schema(&conn);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS search_history (
                word TEXT PRIMARY KEY NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_search_history_timestamp ON search_history(timestamp);
        "#,
        )?;

        Ok(())
    }

    /// Rename `searchedWord` to `word`, preserving rows and their insertion order.
    fn migrate_from_room_schema(conn: &rusqlite::Connection) -> DatabaseResult<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(
            r#"
            ALTER TABLE search_history RENAME TO search_history_old;

            CREATE TABLE search_history (
                word TEXT PRIMARY KEY NOT NULL,
                timestamp INTEGER NOT NULL
            );

            INSERT INTO search_history (word, timestamp)
                SELECT searchedWord, timestamp FROM search_history_old ORDER BY rowid;

            DROP TABLE search_history_old;

            CREATE INDEX IF NOT EXISTS idx_search_history_timestamp ON search_history(timestamp);
        "#,
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Get the database size in bytes
    pub fn database_size(&self) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        Ok(page_count * page_size)
    }

    /// Get total number of history entries
    pub fn count_entries(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM search_history", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert an entry, or move an existing one to the new timestamp
    pub fn upsert_entry(&self, entry: &HistoryEntry) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO search_history (word, timestamp) VALUES (?1, ?2)
               ON CONFLICT(word) DO UPDATE SET timestamp = excluded.timestamp"#,
            params![entry.word, entry.last_searched_at],
        )?;
        Ok(())
    }

    /// Insert an entry only if the word is not stored yet.
    /// Returns whether a row was inserted.
    pub fn insert_if_absent(&self, entry: &HistoryEntry) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO search_history (word, timestamp) VALUES (?1, ?2)",
            params![entry.word, entry.last_searched_at],
        )?;
        Ok(inserted > 0)
    }

    /// Delete an entry by word. Returns whether a row was removed.
    pub fn delete_entry(&self, word: &str) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM search_history WHERE word = ?1", [word])?;
        Ok(deleted > 0)
    }

    /// Delete all entries. Returns the number removed.
    pub fn clear_all(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM search_history", [])?;
        Ok(deleted as u64)
    }

    /// Fetch all entries in insertion order
    pub fn fetch_all(&self) -> DatabaseResult<Vec<HistoryEntry>> {
        self.query_entries("SELECT word, timestamp FROM search_history ORDER BY rowid")
    }

    /// Fetch all entries, most recently searched first
    pub fn fetch_by_recency(&self) -> DatabaseResult<Vec<HistoryEntry>> {
        self.query_entries(
            "SELECT word, timestamp FROM search_history ORDER BY timestamp DESC, rowid DESC",
        )
    }

    /// Look up a single entry
    pub fn find_entry(&self, word: &str) -> DatabaseResult<Option<HistoryEntry>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT word, timestamp FROM search_history WHERE word = ?1",
            [word],
            Self::row_to_entry,
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn query_entries(&self, sql: &str) -> DatabaseResult<Vec<HistoryEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
        Ok(HistoryEntry {
            word: row.get(0)?,
            last_searched_at: row.get(1)?,
        })
    }
}
