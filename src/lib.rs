//! MechanicBuddy - Car symptom diagnosis with a streaming LLM relay
//!
//! A free-text message such as "Toyota 2015 rattling noise" is split into
//! brand, model year and symptom, matched against an in-memory repair
//! database, turned into a prompt, and relayed token by token to an
//! OpenAI-compatible generation endpoint.
//!
//! # Architecture
//!
//! - **records**: issue and step records loaded once from tabular sources
//! - **diagnosis**: message parser, generation mapper, two-stage matcher
//! - **prompt**: prompt composer and upstream payload
//! - **streaming**: upstream client, event decoder, relay with cancellation
//! - **history**: transcript persistence for identified callers
//! - **chat**: the per-request pipeline tying the above together

pub mod errors;
pub mod config;
pub mod records;
pub mod diagnosis;
pub mod prompt;
pub mod streaming;
pub mod history;
pub mod chat;
pub mod cli;

// Re-export commonly used types
pub use errors::{DiagError, Result};
pub use diagnosis::{parse_message, Diagnosis, IssueMatcher, ParsedMessage};
pub use prompt::{compose_prompt, PromptPlan};
pub use records::RecordStore;
pub use streaming::{Relay, RelayOutcome};
pub use chat::{ChatRequest, ChatService};
