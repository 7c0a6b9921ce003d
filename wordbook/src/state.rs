//! Observable search state and its single holder.
//!
//! [`StateHolder`] wraps a `tokio::sync::watch` channel. The only way to change the
//! state is an atomic update from the previous snapshot to the next one; observers
//! either poll a cloned snapshot or subscribe for pushes.

use tokio::sync::watch;

use crate::interface::WordItem;

/// Status of the current dictionary lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LookupStatus {
    #[default]
    Idle,
    Loading,
    Success(WordItem),
    Error(String),
}

impl LookupStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, LookupStatus::Loading)
    }

    /// Success or Error: the lookup will not publish again
    pub fn is_terminal(&self) -> bool {
        matches!(self, LookupStatus::Success(_) | LookupStatus::Error(_))
    }
}

/// Snapshot published to the UI after every mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Text currently in the search field
    pub query: String,
    /// Query of the last search that started a lookup
    pub last_confirmed_query: String,
    pub lookup_status: LookupStatus,
    /// Id of the lookup job `lookup_status` belongs to (0 before the first lookup)
    pub lookup_job: u64,
    /// History words in display order
    pub history_list: Vec<String>,
    /// A resort is waiting for the UI to allow it
    pub pending_resort: bool,
    /// Word awaiting delete confirmation
    pub pending_delete: Option<String>,
    /// Last history-store failure, cleared by the next successful history operation
    pub history_error: Option<String>,
}

impl SearchState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// The first `limit` history words, the slice a history dropdown shows
    pub fn visible_history(&self, limit: usize) -> &[String] {
        &self.history_list[..self.history_list.len().min(limit)]
    }
}

/// Owner of the shared [`SearchState`]
#[derive(Debug)]
pub struct StateHolder {
    tx: watch::Sender<SearchState>,
}

impl StateHolder {
    pub fn new(initial: SearchState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the state with `f(previous)` atomically and notify observers
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&SearchState) -> SearchState,
    {
        self.tx.send_modify(|state| *state = f(state));
    }

    /// Like [`update`](Self::update), but `f` may decline by returning `None`;
    /// observers are only notified when it doesn't. Returns whether the state changed.
    pub fn try_update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&SearchState) -> Option<SearchState>,
    {
        self.tx.send_if_modified(|state| match f(state) {
            Some(next) => {
                *state = next;
                true
            }
            None => false,
        })
    }

    pub fn snapshot(&self) -> SearchState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.tx.subscribe()
    }
}
