use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use exportview_types::IngestEvent;

use crate::decode::decode_line;
use crate::reassembler::LineReassembler;
use crate::state::{IngestState, Phase};

/// Owns the shared ingestion state and the lifecycle of upload sessions.
///
/// Readers subscribe to a `watch` channel and always borrow a whole
/// [`IngestState`]; every fold is a single in-place update under the
/// channel's lock. Starting a new session aborts the task driving the
/// previous one, and folds from a superseded session are rejected even if
/// they race the abort.
#[derive(Clone)]
pub struct Ingestor {
    inner: Arc<IngestorInner>,
}

struct IngestorInner {
    state_tx: watch::Sender<IngestState>,
    last_session: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new()
    }
}

impl Ingestor {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(IngestState::default());
        Self {
            inner: Arc::new(IngestorInner {
                state_tx,
                last_session: AtomicU64::new(0),
                task: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<IngestState> {
        self.inner.state_tx.subscribe()
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> IngestState {
        self.inner.state_tx.borrow().clone()
    }

    /// Start a new session: abort the running one and reset the state before
    /// anything else is applied.
    pub fn begin(&self) -> Session {
        let id = self.inner.last_session.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(previous) = self.lock_task().take() {
            previous.abort();
            debug!(session = id, "Aborted previous ingestion task");
        }

        // Two racing begins must not let the older id win the reset.
        self.inner.state_tx.send_if_modified(|state| {
            if state.session < id {
                *state = IngestState::starting(id);
                true
            } else {
                false
            }
        });

        info!(session = id, "Ingestion session started");
        Session {
            id,
            inner: self.inner.clone(),
        }
    }

    /// Begin a session and drive `work` for it on the runtime. The task is
    /// aborted when the next session begins or [`Ingestor::cancel`] is called.
    pub fn start<F, Fut>(&self, work: F) -> Session
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let session = self.begin();
        let handle = tokio::spawn(work(session.clone()));
        if let Some(previous) = self.lock_task().replace(handle) {
            previous.abort();
        }
        session
    }

    /// Abort the running task, if any, and move a session that is still
    /// loading to [`Phase::Cancelled`]. Accumulated state is kept.
    pub fn cancel(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
        }
        let settled = self.inner.state_tx.send_if_modified(IngestState::cancel);
        if settled {
            info!(session = self.inner.state_tx.borrow().session, "Ingestion cancelled");
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle for one ingestion session. Every write goes through
/// [`Session::update`], which is a no-op once a newer session has begun.
#[derive(Clone)]
pub struct Session {
    id: u64,
    inner: Arc<IngestorInner>,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.inner.state_tx.borrow().session == self.id
    }

    /// Run `f` against the state if it still belongs to this session.
    /// Returns `false` when the session has been superseded or cancelled.
    pub fn update(&self, f: impl FnOnce(&mut IngestState)) -> bool {
        self.inner.state_tx.send_if_modified(|state| {
            if state.session != self.id || state.phase == Phase::Cancelled {
                return false;
            }
            f(state);
            true
        })
    }

    pub fn apply(&self, event: IngestEvent) -> bool {
        self.update(|state| state.apply(event))
    }

    pub fn fail(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.update(|state| state.fail(message))
    }

    pub fn complete(&self, lines_skipped: u64) -> bool {
        self.update(|state| state.complete(lines_skipped))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stream ended and every line was handled.
    Completed { lines_skipped: u64 },
    /// A newer session took over; the rest of the stream was ignored.
    Superseded,
}

/// Read `stream` to the end, folding every decodable line into `session`.
///
/// Lines that fail to decode are logged and skipped. A transport error is
/// returned as-is and leaves the state as accumulated so far; reporting it
/// is the caller's job.
pub async fn ingest_stream<S, B, E>(session: &Session, stream: S) -> Result<IngestOutcome, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = pin!(stream);
    let mut lines = LineReassembler::new();
    let mut skipped = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for line in lines.push(chunk.as_ref()) {
            if !fold_line(session, &line, &mut skipped) {
                return Ok(superseded(session));
            }
        }
    }

    if let Some(rest) = lines.finish() {
        if !fold_line(session, &rest, &mut skipped) {
            return Ok(superseded(session));
        }
    }

    if !session.complete(skipped) {
        return Ok(superseded(session));
    }

    info!(session = session.id(), lines_skipped = skipped, "Ingestion complete");
    Ok(IngestOutcome::Completed {
        lines_skipped: skipped,
    })
}

fn fold_line(session: &Session, line: &str, skipped: &mut u64) -> bool {
    match decode_line(line) {
        Ok(Some(event)) => session.apply(event),
        Ok(None) => true,
        Err(e) => {
            *skipped += 1;
            warn!(session = session.id(), len = line.len(), "Skipping line: {}", e);
            session.is_current()
        }
    }
}

fn superseded(session: &Session) -> IngestOutcome {
    debug!(session = session.id(), "Session superseded, dropping rest of stream");
    IngestOutcome::Superseded
}
