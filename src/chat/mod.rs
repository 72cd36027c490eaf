//! Chat request pipeline
//!
//! Ties parser, matcher, composer, relay and transcript store together for a
//! single request.

pub mod service;

pub use service::{ChatOutcome, ChatRequest, ChatService, PersistenceStatus, PreparedChat, SkipReason};
