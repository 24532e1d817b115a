pub mod api;
pub mod events;
pub mod models;

pub use api::AttachmentRef;
pub use events::IngestEvent;
pub use models::{Attachment, Channel, Message, Reaction};
