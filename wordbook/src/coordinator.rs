//! Search coordinator: the state machine between UI events, the dictionary lookup
//! and the history store.
//!
//! Concurrency Model:
//! - Events go through an unbounded queue into one worker task. The worker is the only
//!   writer of query, history list and pending flags, so history mutations (resort,
//!   reconcile, delete, clear) never interleave. Submitting never blocks.
//! - Each confirmed search spawns a lookup job with its own CancellationToken and id.
//!   Starting a job cancels the previous token before the new job is stored. A job
//!   publishes only while its token is live and its id is still `SearchState.lookup_job`,
//!   checked inside the atomic state update, so a superseded job never publishes.
//! - Lookup jobs write only `lookup_status`; they run concurrently with history work.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dictionary::{DictionaryLookup, LookupEvent, WORD_NOT_FOUND_MESSAGE};
use crate::interface::{HistoryEntry, WordbookError};
use crate::ranking;
use crate::reconcile::HistoryReconciler;
use crate::state::{LookupStatus, SearchState, StateHolder};
use crate::store::{runtime_handle, HistoryStore};

/// Inbound events from the UI or any other driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// The search field changed; `resort` re-orders history against the new text
    QueryChanged { text: String, resort: bool },
    /// Commit the current query as a search
    ConfirmSearch,
    /// Re-order the history list against the current query
    ResortRequested,
    /// The UI allows a deferred resort now (e.g. the search bar closed)
    DeferredResortTrigger,
    /// Ask for confirmation before deleting `word`
    DeleteRequested { word: String },
    /// Delete the word awaiting confirmation
    DeleteConfirmed,
    /// Delete `word` right away
    DeleteHistoryEntry { word: String },
    /// Drop the pending delete
    DeleteCancelled,
    /// Delete every history entry
    ClearHistory,
}

enum Command {
    Initialize,
    Event(SearchEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle to a running coordinator. Dropping it stops the worker and cancels any
/// in-flight lookup.
pub struct SearchCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SearchState>,
}

impl SearchCoordinator {
    /// Start the worker with `default_query` in the search field. Nothing is looked
    /// up until [`initialize`](Self::initialize) is called.
    pub fn new(
        lookup: Arc<dyn DictionaryLookup>,
        store: Arc<dyn HistoryStore>,
        default_query: impl Into<String>,
    ) -> Self {
        let holder = Arc::new(StateHolder::new(SearchState::new(default_query)));
        let state = holder.subscribe();
        let (commands, rx) = mpsc::unbounded_channel();

        let runtime = runtime_handle();
        let worker = CoordinatorWorker {
            reconciler: HistoryReconciler::new(Arc::clone(&store)),
            state: holder,
            lookup,
            store,
            current_job: None,
            next_job_id: 1,
            initialized: false,
            runtime: runtime.clone(),
        };
        runtime.spawn(worker.run(rx));

        Self { commands, state }
    }

    /// Bootstrap search for the default query. Unlike a user confirm it never bumps
    /// an existing history entry and never schedules a deferred resort. Only the
    /// first call has an effect.
    pub fn initialize(&self) -> Result<(), WordbookError> {
        self.send(Command::Initialize)
    }

    /// Queue an event; returns as soon as it is queued
    pub fn submit(&self, event: SearchEvent) -> Result<(), WordbookError> {
        self.send(Command::Event(event))
    }

    pub fn set_query(&self, text: impl Into<String>, resort: bool) -> Result<(), WordbookError> {
        self.submit(SearchEvent::QueryChanged {
            text: text.into(),
            resort,
        })
    }

    pub fn confirm_search(&self) -> Result<(), WordbookError> {
        self.submit(SearchEvent::ConfirmSearch)
    }

    /// Resolves once every previously submitted event has been handled.
    /// Lookup jobs started by those events may still be running.
    pub async fn flush(&self) -> Result<(), WordbookError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Flush(tx))?;
        rx.await.map_err(|_| WordbookError::CoordinatorClosed)
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `predicate`, returning that state
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SearchState, WordbookError>
    where
        F: FnMut(&SearchState) -> bool,
    {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| WordbookError::CoordinatorClosed)?;
        Ok(state.clone())
    }

    /// Handle every queued event, then wait until the lookup current at that point
    /// (or a later one) has a terminal status. Returns right away if nothing has been
    /// looked up yet.
    pub async fn wait_for_lookup(&self) -> Result<SearchState, WordbookError> {
        self.flush().await?;
        let job = self.state.borrow().lookup_job;
        if job == 0 {
            return Ok(self.snapshot());
        }
        self.wait_for(move |s| s.lookup_job >= job && s.lookup_status.is_terminal())
            .await
    }

    fn send(&self, command: Command) -> Result<(), WordbookError> {
        self.commands
            .send(command)
            .map_err(|_| WordbookError::CoordinatorClosed)
    }
}

struct LookupJob {
    id: u64,
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

struct CoordinatorWorker {
    state: Arc<StateHolder>,
    lookup: Arc<dyn DictionaryLookup>,
    store: Arc<dyn HistoryStore>,
    reconciler: HistoryReconciler<dyn HistoryStore>,
    current_job: Option<LookupJob>,
    next_job_id: u64,
    initialized: bool,
    runtime: tokio::runtime::Handle,
}

impl CoordinatorWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Initialize => self.initialize().await,
                Command::Event(event) => self.handle_event(event).await,
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        // Every handle is gone; nobody can observe the lookup anymore.
        if let Some(job) = self.current_job.take() {
            job.token.cancel();
        }
    }

    async fn handle_event(&mut self, event: SearchEvent) {
        tracing::debug!(?event, "handling search event");
        match event {
            SearchEvent::QueryChanged { text, resort } => {
                self.state.update(|s| SearchState {
                    query: text,
                    ..s.clone()
                });
                if resort {
                    self.resort().await;
                }
            }
            SearchEvent::ConfirmSearch => self.confirm_search().await,
            SearchEvent::ResortRequested => self.resort().await,
            SearchEvent::DeferredResortTrigger => {
                if self.state.snapshot().pending_resort {
                    self.reconcile().await;
                    self.resort().await;
                }
            }
            SearchEvent::DeleteRequested { word } => {
                self.state.update(|s| SearchState {
                    pending_delete: Some(word),
                    ..s.clone()
                });
            }
            SearchEvent::DeleteConfirmed => {
                if let Some(word) = self.state.snapshot().pending_delete {
                    self.delete_word(word).await;
                }
                self.clear_pending_delete();
            }
            SearchEvent::DeleteHistoryEntry { word } => {
                self.delete_word(word.clone()).await;
                self.clear_pending_delete_of(&word);
            }
            SearchEvent::DeleteCancelled => self.clear_pending_delete(),
            SearchEvent::ClearHistory => {
                let result = self.store.clear().await;
                if let Some(removed) = self.history_op("clear", result) {
                    tracing::info!(removed, "search history cleared");
                    self.reconcile().await;
                }
            }
        }
    }

    /// Bootstrap: look up the default query, make sure it is in history without
    /// touching an existing entry, then load the history list.
    async fn initialize(&mut self) {
        if self.initialized {
            tracing::debug!("coordinator already initialized");
            return;
        }
        self.initialized = true;

        let query = self.state.snapshot().query;
        if self.start_lookup(&query) {
            let result = self
                .store
                .insert_if_absent(HistoryEntry::searched_now(query))
                .await;
            self.history_op("insert", result);
        }
        self.reconcile().await;
    }

    /// User confirm: look up the query, upsert it into history and leave the
    /// history list resort to the next deferred trigger.
    async fn confirm_search(&mut self) {
        let query = self.state.snapshot().query;
        if !self.start_lookup(&query) {
            tracing::debug!(query = %query, "confirm ignored: blank or unchanged query");
            return;
        }

        self.state.update(|s| SearchState {
            pending_resort: true,
            ..s.clone()
        });

        let result = self.store.upsert(HistoryEntry::searched_now(query)).await;
        self.history_op("upsert", result);
    }

    /// Shared by bootstrap and user confirm. Returns false when the guard rejects
    /// the query (blank, or equal to the last confirmed query ignoring case).
    fn start_lookup(&mut self, query: &str) -> bool {
        let snapshot = self.state.snapshot();
        if query.trim().is_empty() || same_query(query, &snapshot.last_confirmed_query) {
            return false;
        }

        // Cancel first so two jobs are never both current.
        if let Some(previous) = self.current_job.take() {
            tracing::debug!(job = previous.id, "cancelling superseded lookup");
            previous.token.cancel();
        }

        let id = self.next_job_id;
        self.next_job_id += 1;

        // The new job id and its Loading status become visible together.
        self.state.update(|s| SearchState {
            last_confirmed_query: query.to_string(),
            lookup_job: id,
            lookup_status: LookupStatus::Loading,
            ..s.clone()
        });

        let token = CancellationToken::new();
        let handle = self.runtime.spawn(run_lookup(
            Arc::clone(&self.state),
            Arc::clone(&self.lookup),
            query.to_lowercase(),
            id,
            token.clone(),
        ));

        self.current_job = Some(LookupJob {
            id,
            token,
            _handle: handle,
        });
        true
    }

    async fn resort(&self) {
        if self.state.snapshot().query.is_empty() {
            let result = self.reconciler.by_recency().await;
            match self.history_op("list", result) {
                Some(list) => self.state.update(|s| SearchState {
                    history_list: list,
                    pending_resort: false,
                    ..s.clone()
                }),
                None => self.state.update(|s| SearchState {
                    pending_resort: false,
                    ..s.clone()
                }),
            }
            return;
        }

        self.state.update(|s| SearchState {
            history_list: ranking::rank(&s.history_list, &s.query),
            pending_resort: false,
            ..s.clone()
        });
    }

    async fn reconcile(&self) {
        let query = self.state.snapshot().query;
        let result = self.reconciler.reconcile(&query).await;
        if let Some(list) = self.history_op("reconcile", result) {
            self.state.update(|s| SearchState {
                history_list: list,
                pending_resort: false,
                ..s.clone()
            });
        }
    }

    async fn delete_word(&self, word: String) {
        let result = self.store.delete(word.clone()).await;
        if let Some(existed) = self.history_op("delete", result) {
            tracing::debug!(word = %word, existed, "history entry deleted");
            self.reconcile().await;
        }
    }

    /// Clear the pending delete only if it is waiting on `word`
    fn clear_pending_delete_of(&self, word: &str) {
        self.state.try_update(|s| {
            if s.pending_delete.as_deref() != Some(word) {
                return None;
            }
            Some(SearchState {
                pending_delete: None,
                ..s.clone()
            })
        });
    }

    fn clear_pending_delete(&self) {
        self.state.try_update(|s| {
            s.pending_delete.as_ref()?;
            Some(SearchState {
                pending_delete: None,
                ..s.clone()
            })
        });
    }

    /// Surface a history-store result: failures land in `history_error`,
    /// success clears a previous failure.
    fn history_op<T>(&self, operation: &str, result: Result<T, WordbookError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.state.try_update(|s| {
                    s.history_error.as_ref()?;
                    Some(SearchState {
                        history_error: None,
                        ..s.clone()
                    })
                });
                Some(value)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "history store operation failed");
                let message = e.to_string();
                self.state.update(|s| SearchState {
                    history_error: Some(message),
                    ..s.clone()
                });
                None
            }
        }
    }
}

fn same_query(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Publish `status` for job `id` unless the job was cancelled or superseded.
fn publish(state: &StateHolder, id: u64, token: &CancellationToken, status: LookupStatus) -> bool {
    state.try_update(|s| {
        if token.is_cancelled() || s.lookup_job != id {
            return None;
        }
        Some(SearchState {
            lookup_status: status,
            ..s.clone()
        })
    })
}

async fn run_lookup(
    state: Arc<StateHolder>,
    lookup: Arc<dyn DictionaryLookup>,
    word: String,
    id: u64,
    token: CancellationToken,
) {
    // Loading was published together with the job id.
    if token.is_cancelled() || state.snapshot().lookup_job != id {
        return;
    }
    tracing::info!(job = id, word = %word, "lookup started");

    let started = std::panic::catch_unwind(AssertUnwindSafe(|| lookup.lookup(word.clone())));
    let mut events = match started {
        Ok(events) => events,
        Err(_) => {
            tracing::warn!(job = id, "lookup collaborator panicked");
            let status = LookupStatus::Error(WORD_NOT_FOUND_MESSAGE.to_string());
            publish(&state, id, &token, status);
            return;
        }
    };

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(job = id, "lookup cancelled");
                return;
            }
            next = AssertUnwindSafe(events.next()).catch_unwind() => next,
        };

        let status = match next {
            Ok(Some(LookupEvent::Loading)) => continue,
            Ok(Some(LookupEvent::Success(item))) => LookupStatus::Success(item),
            Ok(Some(LookupEvent::Error(message))) => LookupStatus::Error(message),
            Ok(None) => {
                // Stream ended without a terminal result
                LookupStatus::Error(WORD_NOT_FOUND_MESSAGE.to_string())
            }
            Err(_) => {
                tracing::warn!(job = id, "lookup stream panicked");
                LookupStatus::Error(WORD_NOT_FOUND_MESSAGE.to_string())
            }
        };

        let terminal = status.is_terminal();
        if !publish(&state, id, &token, status) {
            tracing::debug!(job = id, "discarding result of superseded lookup");
            return;
        }
        if terminal {
            tracing::info!(job = id, "lookup finished");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::LookupStream;
    use crate::interface::WordItem;
    use crate::store::InMemoryHistoryStore;
    use futures::stream;
    use parking_lot::Mutex;

    /// Answers every word immediately and records what was asked
    #[derive(Default)]
    struct EchoLookup {
        calls: Mutex<Vec<String>>,
    }

    impl DictionaryLookup for EchoLookup {
        fn lookup(&self, word: String) -> LookupStream {
            self.calls.lock().push(word.clone());
            let item = WordItem {
                word,
                ..WordItem::default()
            };
            stream::iter(vec![LookupEvent::Loading, LookupEvent::Success(item)]).boxed()
        }
    }

    struct PanickingLookup;

    impl DictionaryLookup for PanickingLookup {
        fn lookup(&self, _word: String) -> LookupStream {
            panic!("collaborator exploded");
        }
    }

    struct SilentLookup;

    impl DictionaryLookup for SilentLookup {
        fn lookup(&self, _word: String) -> LookupStream {
            stream::iter(vec![LookupEvent::Loading]).boxed()
        }
    }

    fn store_with(words: &[&str]) -> Arc<InMemoryHistoryStore> {
        Arc::new(InMemoryHistoryStore::with_entries(
            words
                .iter()
                .enumerate()
                .map(|(i, w)| HistoryEntry::new(*w, i as i64 + 1)),
        ))
    }

    #[test]
    fn test_same_query_ignores_case() {
        assert!(same_query("Doggo", "dOGGO"));
        assert!(!same_query("Doggo", "Dogg"));
    }

    #[tokio::test]
    async fn test_lookup_uses_lowercased_query() {
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup.clone(), store_with(&[]), "Welcome");

        coordinator.initialize().unwrap();
        let state = coordinator.wait_for_lookup().await.unwrap();

        assert_eq!(lookup.calls.lock().as_slice(), ["welcome"]);
        assert_eq!(state.last_confirmed_query, "Welcome");
        assert_eq!(state.lookup_job, 1);
    }

    #[tokio::test]
    async fn test_initialize_only_once() {
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup.clone(), store_with(&[]), "Welcome");

        coordinator.initialize().unwrap();
        coordinator.set_query("Other", false).unwrap();
        coordinator.initialize().unwrap();
        coordinator.flush().await.unwrap();
        coordinator.wait_for_lookup().await.unwrap();

        assert_eq!(lookup.calls.lock().len(), 1);
        assert_eq!(coordinator.snapshot().lookup_job, 1);
    }

    #[tokio::test]
    async fn test_blank_confirm_is_noop() {
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup.clone(), store_with(&["Foo"]), "");

        coordinator.confirm_search().unwrap();
        coordinator.set_query("   ", false).unwrap();
        coordinator.confirm_search().unwrap();
        coordinator.flush().await.unwrap();

        let state = coordinator.snapshot();
        assert!(lookup.calls.lock().is_empty());
        assert_eq!(state.lookup_status, LookupStatus::Idle);
        assert!(!state.pending_resort);
    }

    #[tokio::test]
    async fn test_panicking_lookup_becomes_error() {
        let coordinator =
            SearchCoordinator::new(Arc::new(PanickingLookup), store_with(&[]), "Welcome");
        coordinator.initialize().unwrap();

        let state = coordinator.wait_for_lookup().await.unwrap();
        assert_eq!(
            state.lookup_status,
            LookupStatus::Error(WORD_NOT_FOUND_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_stream_without_result_becomes_error() {
        let coordinator = SearchCoordinator::new(Arc::new(SilentLookup), store_with(&[]), "Beep");
        coordinator.initialize().unwrap();

        let state = coordinator.wait_for_lookup().await.unwrap();
        assert!(matches!(state.lookup_status, LookupStatus::Error(_)));
    }

    #[tokio::test]
    async fn test_query_change_does_not_debounce_or_lookup() {
        let lookup = Arc::new(EchoLookup::default());
        let coordinator =
            SearchCoordinator::new(lookup.clone(), store_with(&["Hello", "Help"]), "");

        for text in ["h", "he", "hel", "help"] {
            coordinator.set_query(text, true).unwrap();
        }
        coordinator.flush().await.unwrap();

        // Every keystroke is applied; none of them looks anything up.
        assert_eq!(coordinator.snapshot().query, "help");
        assert!(lookup.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_delete_request_then_cancel_keeps_entry() {
        let store = store_with(&["Foo", "Beep"]);
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup, store.clone(), "Beep");
        coordinator.initialize().unwrap();

        coordinator
            .submit(SearchEvent::DeleteRequested { word: "Foo".into() })
            .unwrap();
        coordinator.flush().await.unwrap();
        assert_eq!(coordinator.snapshot().pending_delete.as_deref(), Some("Foo"));

        coordinator.submit(SearchEvent::DeleteCancelled).unwrap();
        coordinator.flush().await.unwrap();

        let state = coordinator.snapshot();
        assert!(state.pending_delete.is_none());
        assert!(state.history_list.contains(&"Foo".to_string()));
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_confirmed_removes_pending_word() {
        let store = store_with(&["Foo", "Beep"]);
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup, store.clone(), "Beep");
        coordinator.initialize().unwrap();

        coordinator
            .submit(SearchEvent::DeleteRequested { word: "Foo".into() })
            .unwrap();
        coordinator.submit(SearchEvent::DeleteConfirmed).unwrap();
        coordinator.flush().await.unwrap();

        let state = coordinator.snapshot();
        assert!(state.pending_delete.is_none());
        assert_eq!(state.history_list, vec!["Beep".to_string()]);
    }

    #[tokio::test]
    async fn test_direct_delete_keeps_other_pending_delete() {
        let store = store_with(&["Foo", "Beep", "New"]);
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup, store.clone(), "Beep");
        coordinator.initialize().unwrap();

        coordinator
            .submit(SearchEvent::DeleteRequested { word: "Foo".into() })
            .unwrap();
        coordinator
            .submit(SearchEvent::DeleteHistoryEntry { word: "New".into() })
            .unwrap();
        coordinator.flush().await.unwrap();

        let state = coordinator.snapshot();
        assert_eq!(state.pending_delete.as_deref(), Some("Foo"));
        assert!(!state.history_list.contains(&"New".to_string()));

        coordinator
            .submit(SearchEvent::DeleteHistoryEntry { word: "Foo".into() })
            .unwrap();
        coordinator.flush().await.unwrap();
        assert!(coordinator.snapshot().pending_delete.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_lookup_after_second_confirm() {
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup, store_with(&[]), "Welcome");

        coordinator.initialize().unwrap();
        let first = coordinator.wait_for_lookup().await.unwrap();
        assert_eq!(first.lookup_job, 1);

        coordinator.set_query("Doggo", false).unwrap();
        coordinator.confirm_search().unwrap();
        let second = coordinator.wait_for_lookup().await.unwrap();

        assert_eq!(second.lookup_job, 2);
        let expected = WordItem {
            word: "doggo".into(),
            ..WordItem::default()
        };
        assert_eq!(second.lookup_status, LookupStatus::Success(expected));
    }

    #[tokio::test]
    async fn test_wait_for_lookup_without_lookup_returns_idle() {
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup, store_with(&[]), "");
        let state = coordinator.wait_for_lookup().await.unwrap();
        assert_eq!(state.lookup_status, LookupStatus::Idle);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let store = store_with(&["Foo", "Beep"]);
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup, store.clone(), "Beep");
        coordinator.initialize().unwrap();
        coordinator.submit(SearchEvent::ClearHistory).unwrap();
        coordinator.flush().await.unwrap();

        assert!(coordinator.snapshot().history_list.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_coordinator_closes_worker() {
        let lookup = Arc::new(EchoLookup::default());
        let coordinator = SearchCoordinator::new(lookup, store_with(&[]), "x");
        let mut rx = coordinator.subscribe();
        drop(coordinator);

        // The worker owns the only sender; it exits once the command queue closes.
        let closed = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
