//! Prompt module
//!
//! Turns a raw message and its diagnosis into the system/user prompt pair and
//! the chat-completion payload sent upstream.

pub mod composer;
pub mod payload;

// Re-export commonly used types
pub use composer::{compose_prompt, PromptPlan, EXPERT_SYSTEM_ROLE, GENERIC_SYSTEM_ROLE};
pub use payload::{ChatMessage, ChatPayload};
