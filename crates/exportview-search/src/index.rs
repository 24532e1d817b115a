use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use exportview_ingest::IngestState;
use exportview_types::Message;

use crate::debounce::Debouncer;
use crate::filter::filter_messages;

/// Quiet period before a typed query is applied.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub debounce: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// The visible message set. Derived from the ingestion state and the user's
/// input; never edited directly.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub active_channel: Option<String>,
    /// Query as typed. May be ahead of `results` while a recompute is pending.
    pub query: String,
    /// Query `results` were computed for.
    pub applied_query: String,
    pub results: Arc<Vec<Message>>,
    /// Incremented on every recompute.
    pub revision: u64,
    /// A debounced recompute is scheduled.
    pub pending: bool,
}

enum Command {
    SelectChannel(Option<String>),
    SetQuery(String),
}

/// Spawns the index task. The task subscribes to the ingestion state and
/// re-derives [`SearchState`] when the active channel, that channel's bucket,
/// or the query changes.
pub struct SearchIndex;

impl SearchIndex {
    pub fn spawn(ingest_rx: watch::Receiver<IngestState>, config: SearchConfig) -> SearchHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SearchState::default());

        let mut task = IndexTask {
            ingest_rx,
            ingest_open: true,
            commands: commands_rx,
            state_tx,
            debouncer: Debouncer::new(config.debounce),
            active: None,
            query: String::new(),
            seen: Observed::default(),
        };
        task.seen = task.observe();

        SearchHandle {
            commands: commands_tx,
            state_rx,
            task: Some(tokio::spawn(task.run())),
        }
    }
}

/// Front end for the index task. Dropping the last handle tears the task
/// down along with any pending recompute.
pub struct SearchHandle {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SearchState>,
    task: Option<JoinHandle<()>>,
}

impl SearchHandle {
    /// Switch channel. Clears the query and recomputes without delay.
    pub fn select_channel(&self, channel: impl Into<String>) {
        let _ = self.commands.send(Command::SelectChannel(Some(channel.into())));
    }

    pub fn clear_channel(&self) {
        let _ = self.commands.send(Command::SelectChannel(None));
    }

    /// Update the query text. Applied once typing pauses for the debounce
    /// window; an empty query is applied immediately.
    pub fn set_query(&self, query: impl Into<String>) {
        let _ = self.commands.send(Command::SetQuery(query.into()));
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state_rx.clone()
    }

    pub fn snapshot(&self) -> SearchState {
        self.state_rx.borrow().clone()
    }

    /// Stop the task. No recompute runs after this returns.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// What the current results were derived from: the ingestion session and
/// the append revision of the active bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Observed {
    session: u64,
    bucket_revision: Option<u64>,
}

struct IndexTask {
    ingest_rx: watch::Receiver<IngestState>,
    ingest_open: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<SearchState>,
    debouncer: Debouncer,
    active: Option<String>,
    query: String,
    seen: Observed,
}

impl IndexTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::SelectChannel(channel)) => self.on_channel(channel),
                    Some(Command::SetQuery(query)) => self.on_query(query),
                    None => break,
                },
                changed = self.ingest_rx.changed(), if self.ingest_open => {
                    if changed.is_err() {
                        // Ingestor is gone; the store can no longer change.
                        self.ingest_open = false;
                        continue;
                    }
                    self.on_store_change();
                }
                _ = self.debouncer.fired() => {
                    trace!(query = %self.query, "Debounce window elapsed");
                    self.recompute();
                }
            }
        }

        self.debouncer.cancel();
        debug!("Search index stopped");
    }

    fn on_channel(&mut self, channel: Option<String>) {
        debug!(channel = ?channel, "Active channel changed");
        self.active = channel;
        self.query.clear();
        self.debouncer.cancel();
        self.recompute();
    }

    fn on_query(&mut self, query: String) {
        if query == self.query {
            return;
        }
        self.query = query;

        if self.query.is_empty() {
            self.debouncer.cancel();
            self.recompute();
            return;
        }

        self.debouncer.arm();
        let query = self.query.clone();
        self.state_tx.send_modify(|state| {
            state.query = query;
            state.pending = true;
        });
    }

    fn on_store_change(&mut self) {
        let observed = self.observe();
        if observed == self.seen {
            return;
        }
        trace!(?observed, "Active bucket changed");

        if observed.session != self.seen.session {
            // A new upload starts from an empty view.
            debug!(session = observed.session, "New ingestion session, resetting view");
            self.active = None;
            self.query.clear();
            self.debouncer.cancel();
            self.recompute();
        } else if self.query.is_empty() {
            self.debouncer.cancel();
            self.recompute();
        } else {
            self.seen = observed;
            self.debouncer.arm_if_idle();
            self.state_tx.send_modify(|state| state.pending = true);
        }
    }

    fn observe(&self) -> Observed {
        let ingest = self.ingest_rx.borrow();
        Observed {
            session: ingest.session,
            bucket_revision: self
                .active
                .as_deref()
                .and_then(|channel| ingest.store.revision(channel)),
        }
    }

    /// Derive results from the active bucket. The ingestion state is only
    /// borrowed long enough to clone the bucket handle; filtering runs on the
    /// clone so ingestion is never blocked behind a scan.
    fn recompute(&mut self) {
        let (bucket, observed) = {
            let ingest = self.ingest_rx.borrow();
            let active = self.active.as_deref();
            let bucket = active.and_then(|c| ingest.store.get(c)).cloned();
            let observed = Observed {
                session: ingest.session,
                bucket_revision: active.and_then(|c| ingest.store.revision(c)),
            };
            (bucket, observed)
        };

        let results = match bucket {
            None => Arc::default(),
            Some(bucket) if self.query.is_empty() => bucket,
            Some(bucket) => Arc::new(filter_messages(&bucket, &self.query)),
        };
        self.seen = observed;

        debug!(
            channel = ?self.active,
            query = %self.query,
            results = results.len(),
            "Search results recomputed"
        );

        let active = self.active.clone();
        let query = self.query.clone();
        self.state_tx.send_modify(|state| {
            state.active_channel = active;
            state.applied_query = query.clone();
            state.query = query;
            state.results = results;
            state.revision += 1;
            state.pending = false;
        });
    }
}
