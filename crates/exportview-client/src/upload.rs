use std::path::PathBuf;

use tracing::{debug, error};

use exportview_ingest::{IngestOutcome, Ingestor, Session, ingest_stream};

use crate::backend::BackendClient;
use crate::error::ClientError;

/// Top-level upload handler. Runs at most one upload at a time: starting
/// another aborts the one in flight and its late output is discarded.
/// Failures of any stage end up in the ingestion state's error slot.
#[derive(Clone)]
pub struct Uploader {
    backend: BackendClient,
    ingestor: Ingestor,
}

impl Uploader {
    pub fn new(backend: BackendClient, ingestor: Ingestor) -> Self {
        Self { backend, ingestor }
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Start uploading `path` in the background. The returned session
    /// identifies this upload in the ingestion state.
    pub fn upload(&self, path: impl Into<PathBuf>) -> Session {
        let backend = self.backend.clone();
        let path = path.into();
        self.ingestor
            .start(move |session| async move { run(backend, session, path).await })
    }

    /// Abort the running upload. What was ingested so far stays visible.
    pub fn cancel(&self) {
        self.ingestor.cancel();
    }
}

async fn run(backend: BackendClient, session: Session, path: PathBuf) {
    let result = match backend.upload_archive(&path).await {
        Ok(body) => ingest_stream(&session, body).await.map_err(ClientError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(IngestOutcome::Completed { lines_skipped }) => {
            debug!(session = session.id(), lines_skipped, "Upload finished");
        }
        Ok(IngestOutcome::Superseded) => {}
        Err(e) => {
            error!(session = session.id(), path = %path.display(), "Upload failed: {}", e);
            session.fail(e.to_string());
        }
    }
}
