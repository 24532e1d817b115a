//! Live search over the message store while it is still being ingested.

pub mod debounce;
pub mod filter;
pub mod index;

pub use debounce::Debouncer;
pub use filter::{filter_messages, matches};
pub use index::{SearchConfig, SearchHandle, SearchIndex, SearchState};
