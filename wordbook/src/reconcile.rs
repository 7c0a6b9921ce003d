//! Refresh of the in-memory history list from the persisted store.

use std::sync::Arc;

use crate::interface::WordbookError;
use crate::models::entry_words;
use crate::ranking;
use crate::store::HistoryStore;

/// Re-derives the candidate list from the store and ranks it against a query.
///
/// Touches only history; callers serialize it with other history mutations.
pub struct HistoryReconciler<S: ?Sized> {
    store: Arc<S>,
}

impl<S: HistoryStore + ?Sized> HistoryReconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every stored word, ranked by similarity to `query`
    pub async fn reconcile(&self, query: &str) -> Result<Vec<String>, WordbookError> {
        let words = entry_words(self.store.list_all().await?);
        Ok(ranking::rank(&words, query))
    }

    /// Every stored word, most recently searched first
    pub async fn by_recency(&self) -> Result<Vec<String>, WordbookError> {
        Ok(entry_words(self.store.list_by_recency().await?))
    }
}
