//! Chat history module
//!
//! Completed exchanges are handed to a transcript store once the relay has
//! delivered the last chunk. Anonymous requests are never stored.

pub mod store;
pub mod types;

// Re-export key types
pub use store::{PersistenceConfig, InMemoryTranscriptStore, JsonlTranscriptStore, TranscriptStore};
pub use types::{ChatEntry, ChatExchange, HistoryItem, Role, UserId};
