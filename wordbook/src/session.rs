//! FFI surface over the search coordinator.
//!
//! [`SearchSession`] owns a [`SearchCoordinator`] wired to the SQLite history store
//! and the HTTP dictionary client. Event methods only queue and return immediately;
//! the host observes results by polling [`SearchSession::snapshot`] or awaiting
//! [`SearchSession::wait_for_lookup`].

use std::sync::Arc;

use crate::config::WordbookConfig;
use crate::coordinator::{SearchCoordinator, SearchEvent};
use crate::dictionary::{DictionaryLookup, FreeDictionaryClient};
use crate::interface::{LookupState, SearchSnapshot, WordbookError};
use crate::state::{LookupStatus, SearchState};
use crate::store::{HistoryStore, SqliteHistoryStore};

impl From<LookupStatus> for LookupState {
    fn from(status: LookupStatus) -> Self {
        match status {
            LookupStatus::Idle => LookupState::Idle,
            LookupStatus::Loading => LookupState::Loading,
            LookupStatus::Success(item) => LookupState::Success { item },
            LookupStatus::Error(message) => LookupState::Failed { message },
        }
    }
}

impl From<SearchState> for SearchSnapshot {
    fn from(state: SearchState) -> Self {
        Self {
            query: state.query,
            last_confirmed_query: state.last_confirmed_query,
            lookup: state.lookup_status.into(),
            lookup_job: state.lookup_job,
            history: state.history_list,
            pending_resort: state.pending_resort,
            pending_delete: state.pending_delete,
            history_error: state.history_error,
        }
    }
}

/// Search screen state machine exported to the host app
#[derive(uniffi::Object)]
pub struct SearchSession {
    coordinator: SearchCoordinator,
}

impl SearchSession {
    /// Session over arbitrary collaborators
    pub fn with_collaborators(
        lookup: Arc<dyn DictionaryLookup>,
        store: Arc<dyn HistoryStore>,
        default_query: impl Into<String>,
    ) -> Self {
        Self {
            coordinator: SearchCoordinator::new(lookup, store, default_query),
        }
    }

    pub fn coordinator(&self) -> &SearchCoordinator {
        &self.coordinator
    }
}

// FFI-exported constructor (must be in standalone impl block)
#[uniffi::export]
impl SearchSession {
    /// Open the history database at `db_path` and look words up at `api_base_url`.
    /// Call [`initialize`](Self::initialize) once the UI is ready.
    #[uniffi::constructor]
    pub fn new(
        db_path: String,
        api_base_url: String,
        default_query: String,
    ) -> Result<Self, WordbookError> {
        let config = WordbookConfig {
            database_path: db_path.into(),
            api_base_url,
            default_query,
            ..WordbookConfig::default()
        };
        config.validate()?;

        let store = SqliteHistoryStore::new(config.database_path.to_string_lossy().into_owned())?;
        let client = FreeDictionaryClient::new(&config.api_base_url, config.request_timeout())?;
        Ok(Self::with_collaborators(
            Arc::new(client),
            Arc::new(store),
            config.default_query,
        ))
    }
}

#[uniffi::export]
impl SearchSession {
    pub fn initialize(&self) -> Result<(), WordbookError> {
        self.coordinator.initialize()
    }

    /// The search field changed; `resort` re-orders history against the new text
    pub fn update_query(&self, text: String, resort: bool) -> Result<(), WordbookError> {
        self.coordinator.set_query(text, resort)
    }

    pub fn confirm_search(&self) -> Result<(), WordbookError> {
        self.coordinator.confirm_search()
    }

    pub fn request_resort(&self) -> Result<(), WordbookError> {
        self.coordinator.submit(SearchEvent::ResortRequested)
    }

    /// Run the resort a confirmed search left pending, if any
    pub fn deferred_resort(&self) -> Result<(), WordbookError> {
        self.coordinator.submit(SearchEvent::DeferredResortTrigger)
    }

    pub fn request_delete(&self, word: String) -> Result<(), WordbookError> {
        self.coordinator.submit(SearchEvent::DeleteRequested { word })
    }

    pub fn confirm_delete(&self) -> Result<(), WordbookError> {
        self.coordinator.submit(SearchEvent::DeleteConfirmed)
    }

    pub fn cancel_delete(&self) -> Result<(), WordbookError> {
        self.coordinator.submit(SearchEvent::DeleteCancelled)
    }

    pub fn delete_entry(&self, word: String) -> Result<(), WordbookError> {
        self.coordinator.submit(SearchEvent::DeleteHistoryEntry { word })
    }

    pub fn clear_history(&self) -> Result<(), WordbookError> {
        self.coordinator.submit(SearchEvent::ClearHistory)
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.coordinator.snapshot().into()
    }

    /// Wait until every queued event has been handled
    pub async fn flush(&self) -> Result<(), WordbookError> {
        self.coordinator.flush().await
    }

    /// Wait for the result of the latest confirmed search
    pub async fn wait_for_lookup(&self) -> Result<SearchSnapshot, WordbookError> {
        Ok(self.coordinator.wait_for_lookup().await?.into())
    }
}
