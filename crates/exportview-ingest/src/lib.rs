//! Streamed ingestion of an upload response.
//!
//! The backend answers an archive upload with newline-delimited JSON of
//! unknown length. This crate turns that byte stream into a per-channel
//! message store while it is still arriving:
//! - `reassembler`: arbitrary chunks in, complete lines out
//! - `decode`: one line to one typed record, best effort
//! - `state`: the fold of records into shared ingestion state
//! - `ingestor`: session lifecycle, cancellation, the read loop

pub mod decode;
pub mod ingestor;
pub mod reassembler;
pub mod state;

pub use decode::{DecodeError, decode_line};
pub use ingestor::{IngestOutcome, Ingestor, Session, ingest_stream};
pub use reassembler::LineReassembler;
pub use state::{Bucket, IngestState, MessageStore, Phase};
