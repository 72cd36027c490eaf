//! Token-streaming relay
//!
//! Sends a payload upstream, decodes the event stream, and forwards each token
//! to the caller as soon as it arrives while accumulating the full answer.
//!
//! Two forms are provided:
//! - [`Relay::token_stream`]: a lazy stream of byte chunks
//! - [`Relay::relay`]: drives the stream into a [`ChunkSink`], honours a
//!   cancellation signal, and reports the accumulated text
//!
//! Dropping the upstream byte stream aborts the HTTP request, so every early
//! exit below also cancels upstream work.

use crate::errors::Result;
use crate::prompt::ChatPayload;
use crate::streaming::cancel::{wait_cancelled, CancelSignal};
use crate::streaming::client::{ByteStream, Upstream};
use crate::streaming::decoder::EventDecoder;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Caller went away; the chunk was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Destination for relayed chunks (usually the caller's response body)
#[async_trait]
pub trait ChunkSink: Send {
    async fn send_chunk(&mut self, chunk: Bytes) -> std::result::Result<(), Disconnected>;

    /// Resolves once the caller is known to be gone; never, if that can't be observed
    async fn closed(&mut self) {
        std::future::pending::<()>().await
    }
}

#[async_trait]
impl ChunkSink for mpsc::Sender<Bytes> {
    async fn send_chunk(&mut self, chunk: Bytes) -> std::result::Result<(), Disconnected> {
        self.send(chunk).await.map_err(|_| Disconnected)
    }

    async fn closed(&mut self) {
        mpsc::Sender::closed(self).await
    }
}

/// Adapts a synchronous callback; returning `Err(Disconnected)` stops the relay
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: FnMut(Bytes) -> std::result::Result<(), Disconnected> + Send,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

#[async_trait]
impl<F> ChunkSink for FnSink<F>
where
    F: FnMut(Bytes) -> std::result::Result<(), Disconnected> + Send,
{
    async fn send_chunk(&mut self, chunk: Bytes) -> std::result::Result<(), Disconnected> {
        (self.0)(chunk)
    }
}

/// Why a relay stopped before the end of the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The cancellation signal fired
    Signalled,
    /// The sink refused a chunk
    CallerDisconnected,
}

/// How a relay ended when the upstream itself did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Sentinel reached or stream exhausted; `text` is the whole answer
    Completed { text: String, chunks: usize },
    /// Stopped early; the partial text is discarded
    Cancelled { reason: CancelReason, chunks: usize },
}

impl RelayOutcome {
    /// Full text, only for a completed relay
    pub fn completed_text(&self) -> Option<&str> {
        match self {
            RelayOutcome::Completed { text, .. } => Some(text),
            RelayOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RelayOutcome::Completed { .. })
    }
}

enum Phase {
    Pending(ChatPayload),
    Streaming(ByteStream),
    Done,
}

struct StreamState {
    phase: Phase,
    decoder: EventDecoder,
    queue: VecDeque<String>,
}

/// Streaming relay bound to one upstream
#[derive(Clone)]
pub struct Relay {
    upstream: Arc<dyn Upstream>,
}

impl Relay {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Lazy stream of token chunks; nothing is sent upstream until first poll
    ///
    /// Ends cleanly at the sentinel or when the upstream closes. A transport
    /// failure is yielded once as `Err` and then the stream ends.
    pub fn token_stream(&self, payload: ChatPayload) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
        let upstream = Arc::clone(&self.upstream);
        let state = StreamState {
            phase: Phase::Pending(payload),
            decoder: EventDecoder::new(),
            queue: VecDeque::new(),
        };

        stream::unfold(state, move |mut state| {
            let upstream = Arc::clone(&upstream);
            async move {
                loop {
                    if let Some(token) = state.queue.pop_front() {
                        return Some((Ok(Bytes::from(token)), state));
                    }

                    match std::mem::replace(&mut state.phase, Phase::Done) {
                        Phase::Done => return None,
                        Phase::Pending(payload) => match upstream.open(&payload).await {
                            Ok(body) => state.phase = Phase::Streaming(body),
                            Err(e) => return Some((Err(e), state)),
                        },
                        Phase::Streaming(mut body) => match body.next().await {
                            Some(Ok(bytes)) => match state.decoder.push(&bytes) {
                                Ok(tokens) => {
                                    state.queue.extend(tokens);
                                    if !state.decoder.is_terminated() {
                                        state.phase = Phase::Streaming(body);
                                    }
                                }
                                Err(e) => return Some((Err(e), state)),
                            },
                            Some(Err(e)) => return Some((Err(e), state)),
                            None => {
                                let tail = state.decoder.finish();
                                state.queue.extend(tail);
                            }
                        },
                    }
                }
            }
        })
    }

    /// Relay a payload into `sink`, accumulating the full answer
    ///
    /// Upstream failures are returned as `Err`. Cancellation and caller
    /// disconnects are not errors; they yield [`RelayOutcome::Cancelled`].
    pub async fn relay<S: ChunkSink>(
        &self,
        payload: ChatPayload,
        sink: &mut S,
        mut cancel: Option<CancelSignal>,
    ) -> Result<RelayOutcome> {
        let tokens = self.token_stream(payload);
        futures_util::pin_mut!(tokens);

        let mut full = String::new();
        let mut chunks = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => {
                    info!(chunks, "relay cancelled by signal");
                    return Ok(RelayOutcome::Cancelled { reason: CancelReason::Signalled, chunks });
                }
                _ = sink.closed() => {
                    info!(chunks, "caller disconnected, dropping upstream stream");
                    return Ok(RelayOutcome::Cancelled { reason: CancelReason::CallerDisconnected, chunks });
                }
                next = tokens.next() => next,
            };

            let chunk = match next {
                Some(chunk) => chunk?,
                None => break,
            };

            full.push_str(&String::from_utf8_lossy(&chunk));
            chunks += 1;

            let delivered = tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => {
                    info!(chunks, "relay cancelled by signal");
                    return Ok(RelayOutcome::Cancelled { reason: CancelReason::Signalled, chunks });
                }
                delivered = sink.send_chunk(chunk) => delivered,
            };

            if delivered.is_err() {
                info!(chunks, "caller disconnected, dropping upstream stream");
                return Ok(RelayOutcome::Cancelled {
                    reason: CancelReason::CallerDisconnected,
                    chunks,
                });
            }
        }

        debug!(chunks, bytes = full.len(), "relay completed");
        Ok(RelayOutcome::Completed { text: full, chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DiagError;

    struct Scripted {
        lines: Vec<&'static str>,
    }

    #[async_trait]
    impl Upstream for Scripted {
        async fn open(&self, _payload: &ChatPayload) -> Result<ByteStream> {
            let chunks: Vec<Result<Bytes>> = self
                .lines
                .iter()
                .map(|line| Ok(Bytes::from(format!("{}\n", line))))
                .collect();
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    struct Refusing;

    #[async_trait]
    impl Upstream for Refusing {
        async fn open(&self, _payload: &ChatPayload) -> Result<ByteStream> {
            Err(DiagError::UpstreamStatus {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    fn payload() -> ChatPayload {
        ChatPayload {
            model: "mistral".to_string(),
            messages: vec![],
            stream: true,
            max_tokens: 1000,
            temperature: 0.2,
        }
    }

    const HEL: &str = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
    const LO: &str = r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#;

    #[tokio::test]
    async fn test_token_stream_yields_in_order() {
        let relay = Relay::new(Arc::new(Scripted {
            lines: vec![HEL, LO, "data: [DONE]", LO],
        }));

        let chunks: Vec<Bytes> = relay
            .token_stream(payload())
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(chunks, vec![Bytes::from("Hel"), Bytes::from("lo")]);
    }

    #[tokio::test]
    async fn test_relay_accumulates() {
        let relay = Relay::new(Arc::new(Scripted {
            lines: vec![HEL, "data: {broken", "", LO, "data: [DONE]"],
        }));

        let mut seen = Vec::new();
        let mut sink = FnSink::new(|chunk: Bytes| {
            seen.push(chunk);
            Ok(())
        });
        let outcome = relay.relay(payload(), &mut sink, None).await.unwrap();

        assert_eq!(
            outcome,
            RelayOutcome::Completed {
                text: "Hello".to_string(),
                chunks: 2
            }
        );
        assert_eq!(seen, vec![Bytes::from("Hel"), Bytes::from("lo")]);
    }

    #[tokio::test]
    async fn test_exhausted_stream_without_sentinel_completes() {
        let relay = Relay::new(Arc::new(Scripted { lines: vec![HEL, LO] }));
        let mut sink = FnSink::new(|_| Ok(()));

        let outcome = relay.relay(payload(), &mut sink, None).await.unwrap();
        assert_eq!(outcome.completed_text(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let relay = Relay::new(Arc::new(Refusing));
        let mut sink = FnSink::new(|_| Ok(()));

        let err = relay.relay(payload(), &mut sink, None).await.unwrap_err();
        assert!(matches!(err, DiagError::UpstreamStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_disconnect_stops_relay() {
        let relay = Relay::new(Arc::new(Scripted {
            lines: vec![HEL, LO, "data: [DONE]"],
        }));
        let mut sent = 0;
        let mut sink = FnSink::new(|_| {
            sent += 1;
            if sent > 1 {
                Err(Disconnected)
            } else {
                Ok(())
            }
        });

        let outcome = relay.relay(payload(), &mut sink, None).await.unwrap();
        assert_eq!(
            outcome,
            RelayOutcome::Cancelled {
                reason: CancelReason::CallerDisconnected,
                chunks: 2
            }
        );
        assert_eq!(outcome.completed_text(), None);
    }

    #[tokio::test]
    async fn test_mpsc_sink_closed_receiver() {
        let relay = Relay::new(Arc::new(Scripted {
            lines: vec![HEL, LO, "data: [DONE]"],
        }));
        let (mut tx, rx) = mpsc::channel(4);
        drop(rx);

        let outcome = relay.relay(payload(), &mut tx, None).await.unwrap();
        assert!(!outcome.is_completed());
    }
}
