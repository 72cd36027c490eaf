//! Streaming relay module
//!
//! Provides the upstream generation client, the incremental event decoder and
//! the relay that forwards tokens to the caller.

pub mod cancel;
pub mod client;
pub mod decoder;
pub mod relay;

// Re-export commonly used types
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use client::{ByteStream, HttpUpstream, Upstream, DEFAULT_MODEL, DEFAULT_UPSTREAM_URL};
pub use decoder::{DecoderState, EventDecoder, DONE_SENTINEL, EVENT_MARKER, MAX_LINE_SIZE};
pub use relay::{CancelReason, ChunkSink, Disconnected, FnSink, Relay, RelayOutcome};
