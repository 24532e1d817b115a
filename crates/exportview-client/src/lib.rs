//! HTTP side of the export viewer: archive upload with a streamed NDJSON
//! response, attachment download and the backend's own search endpoint.

pub mod backend;
pub mod error;
pub mod upload;

pub use backend::{BackendClient, ByteStream};
pub use error::ClientError;
pub use upload::Uploader;
