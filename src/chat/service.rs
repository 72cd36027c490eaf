//! Chat service
//!
//! raw text → parse → diagnose → compose → relay → persist (identified callers,
//! completed relays only). Requests share nothing mutable; the record store is
//! read-only and the transcript store is append-only.

use crate::config::UpstreamConfig;
use crate::diagnosis::{parse_message, Diagnosis, IssueMatcher, ParsedMessage};
use crate::errors::Result;
use crate::history::{ChatExchange, TranscriptStore, UserId};
use crate::prompt::{compose_prompt, ChatPayload, PromptPlan};
use crate::records::RecordStore;
use crate::streaming::{CancelSignal, ChunkSink, Relay, RelayOutcome, Upstream};
use std::sync::Arc;
use tracing::{debug, error, info};

/// One incoming chat message
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    /// `None` for anonymous callers
    pub identity: Option<UserId>,
}

impl ChatRequest {
    pub fn anonymous(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            identity: None,
        }
    }

    pub fn for_user(message: impl Into<String>, identity: UserId) -> Self {
        Self {
            message: message.into(),
            identity: Some(identity),
        }
    }
}

/// Everything decided before the upstream call
#[derive(Debug, Clone)]
pub struct PreparedChat {
    /// Trimmed message as the user sent it
    pub message: String,
    pub parsed: ParsedMessage,
    pub diagnosis: Diagnosis,
    pub plan: PromptPlan,
    pub payload: ChatPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Anonymous,
    Incomplete,
}

/// What happened to the transcript of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Stored,
    Skipped(SkipReason),
    /// The answer was delivered but could not be stored
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub diagnosis: Diagnosis,
    pub relay: RelayOutcome,
    pub persistence: PersistenceStatus,
}

/// Per-process chat service; cheap to clone into request tasks
#[derive(Clone)]
pub struct ChatService {
    records: Arc<RecordStore>,
    relay: Relay,
    transcripts: Arc<dyn TranscriptStore>,
    upstream: UpstreamConfig,
}

impl ChatService {
    pub fn new(
        records: Arc<RecordStore>,
        upstream_client: Arc<dyn Upstream>,
        transcripts: Arc<dyn TranscriptStore>,
        upstream: UpstreamConfig,
    ) -> Self {
        Self {
            records,
            relay: Relay::new(upstream_client),
            transcripts,
            upstream,
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Parse, diagnose and compose without touching the network
    pub fn prepare(&self, raw_message: &str) -> PreparedChat {
        let message = raw_message.trim().to_string();
        let parsed = parse_message(&message);
        let diagnosis = IssueMatcher::new(&self.records).diagnose_message(&parsed);
        let plan = compose_prompt(&message, &diagnosis);
        let payload = ChatPayload::from_plan(&plan, &self.upstream);

        debug!(
            brand = ?parsed.brand,
            year = ?parsed.year,
            found = diagnosis.is_found(),
            "chat prepared"
        );

        PreparedChat {
            message,
            parsed,
            diagnosis,
            plan,
            payload,
        }
    }

    /// Run one request end to end, streaming chunks into `sink`
    ///
    /// Upstream failures are returned as errors and nothing is stored.
    pub async fn handle<S: ChunkSink>(
        &self,
        request: ChatRequest,
        sink: &mut S,
        cancel: Option<CancelSignal>,
    ) -> Result<ChatOutcome> {
        let prepared = self.prepare(&request.message);

        let relay = match self.relay.relay(prepared.payload, sink, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "upstream failed, aborting response");
                return Err(e);
            }
        };

        let persistence = self
            .persist(request.identity, prepared.message, &relay)
            .await;

        Ok(ChatOutcome {
            diagnosis: prepared.diagnosis,
            relay,
            persistence,
        })
    }

    async fn persist(
        &self,
        identity: Option<UserId>,
        message: String,
        relay: &RelayOutcome,
    ) -> PersistenceStatus {
        let Some(answer) = relay.completed_text() else {
            return PersistenceStatus::Skipped(SkipReason::Incomplete);
        };
        let Some(user) = identity else {
            return PersistenceStatus::Skipped(SkipReason::Anonymous);
        };

        let exchange = ChatExchange::new(user, message, answer);
        match self.transcripts.append(exchange).await {
            Ok(()) => {
                info!("exchange stored");
                PersistenceStatus::Stored
            }
            Err(e) => {
                error!(error = %e, "failed to store exchange");
                PersistenceStatus::Failed(e.to_string())
            }
        }
    }
}
