//! Wordbook Core - Rust business logic for the word-lookup app
//!
//! This library implements the search coordinator behind the dictionary screen:
//! fuzzy ranking of search history, cancellable dictionary lookups, and a SQLite
//! history store.
//!
//! Types are exported via UniFFI proc-macros (#[derive(uniffi::Record/Enum)]).

pub mod config;
pub mod coordinator;
pub mod database;
pub mod dictionary;
pub mod interface;
pub mod models;
pub mod ranking;
pub mod reconcile;
pub mod session;
pub mod similarity;
pub mod state;
pub mod store;

pub use config::WordbookConfig;
pub use coordinator::{SearchCoordinator, SearchEvent};
pub use dictionary::{DictionaryLookup, FreeDictionaryClient, LookupEvent, LookupStream};
pub use interface::*;
pub use session::SearchSession;
pub use state::{LookupStatus, SearchState};
pub use store::{HistoryStore, InMemoryHistoryStore, SqliteHistoryStore};

uniffi::setup_scaffolding!("wordbook");
