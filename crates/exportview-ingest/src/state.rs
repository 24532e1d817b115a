use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use exportview_types::{Channel, IngestEvent, Message};

/// Messages of one channel, in arrival order.
///
/// Shared copy-on-write: a reader holding a clone keeps seeing the bucket as
/// it was when it took the clone, and an append never mutates a vector some
/// reader still holds.
pub type Bucket = Arc<Vec<Message>>;

#[derive(Debug, Clone, Default)]
struct Slot {
    messages: Bucket,
    /// Bumped on every append.
    revision: u64,
}

/// Channel name -> ordered messages. Append-only for the lifetime of one
/// ingestion session.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    slots: HashMap<String, Slot>,
}

impl MessageStore {
    pub fn get(&self, channel: &str) -> Option<&Bucket> {
        self.slots.get(channel).map(|slot| &slot.messages)
    }

    /// Append revision of a bucket, `None` if it does not exist yet.
    pub fn revision(&self, channel: &str) -> Option<u64> {
        self.slots.get(channel).map(|slot| slot.revision)
    }

    /// Append `messages` to the bucket for `channel`, creating it if needed.
    /// No deduplication.
    pub fn append(&mut self, channel: &str, messages: Vec<Message>) {
        let slot = self.slots.entry(channel.to_owned()).or_default();
        Arc::make_mut(&mut slot.messages).extend(messages);
        slot.revision += 1;
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn message_count(&self) -> usize {
        self.slots.values().map(|slot| slot.messages.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No upload started yet.
    #[default]
    Idle,
    Loading,
    Complete,
    /// Transport failure or a server-reported error. Records may still be
    /// folded after a server-reported error.
    Failed,
    /// Stopped by the user before the stream ended.
    Cancelled,
}

/// Everything one upload produces. Replaced wholesale when a new upload
/// starts; otherwise only ever changed through [`IngestState::apply`] and the
/// lifecycle methods below.
#[derive(Debug, Clone, Default)]
pub struct IngestState {
    /// Session this state belongs to. Zero before the first upload.
    pub session: u64,
    pub phase: Phase,
    /// Progress text for the user.
    pub status: String,
    pub channels: Vec<Channel>,
    pub store: MessageStore,
    /// The single user-visible error slot. Last writer wins.
    pub error: Option<String>,
    pub records_applied: u64,
    pub lines_skipped: u64,
}

impl IngestState {
    pub fn starting(session: u64) -> Self {
        Self {
            session,
            phase: Phase::Loading,
            status: "Starting upload...".into(),
            ..Self::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Fold one record into the state.
    pub fn apply(&mut self, event: IngestEvent) {
        self.records_applied += 1;
        match event {
            IngestEvent::Channels { data } => {
                debug!(session = self.session, count = data.len(), "Channel list received");
                self.channels = data;
                self.set_status("Processing channels...".into());
            }
            IngestEvent::Messages { channel, data } => {
                debug!(session = self.session, channel = %channel, count = data.len(), "Appending messages");
                self.set_status(format!("Processing messages from {}...", channel));
                self.store.append(&channel, data);
            }
            IngestEvent::Error { data } => {
                warn!(session = self.session, "Backend reported error: {}", data.message());
                self.error = Some(data.message().to_owned());
                self.phase = Phase::Failed;
            }
        }
    }

    /// Record a fatal failure. Whatever was accumulated stays.
    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.phase = Phase::Failed;
    }

    /// Mark the stream finished. A session that already failed stays failed.
    pub fn complete(&mut self, lines_skipped: u64) {
        self.lines_skipped = lines_skipped;
        if self.phase == Phase::Loading {
            self.phase = Phase::Complete;
            self.status = "Upload complete!".into();
        }
    }

    /// Settle a session whose stream was abandoned. Returns `false` when the
    /// session had already finished.
    pub fn cancel(&mut self) -> bool {
        if self.phase != Phase::Loading {
            return false;
        }
        self.phase = Phase::Cancelled;
        self.status = "Upload cancelled".into();
        true
    }

    /// Progress text only moves while the upload is still healthy.
    fn set_status(&mut self, status: String) {
        if self.phase == Phase::Loading {
            self.status = status;
        }
    }
}
