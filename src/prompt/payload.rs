//! Chat-completion request payload

use crate::config::UpstreamConfig;
use crate::prompt::composer::PromptPlan;
use serde::{Deserialize, Serialize};

/// One role-tagged message in the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Streaming chat-completion request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatPayload {
    /// Build a streaming request from a prompt plan and the upstream sampling settings
    pub fn from_plan(plan: &PromptPlan, upstream: &UpstreamConfig) -> Self {
        Self {
            model: upstream.model.clone(),
            messages: vec![
                ChatMessage::system(plan.system_role.as_str()),
                ChatMessage::user(plan.user_prompt.as_str()),
            ],
            stream: true,
            max_tokens: upstream.max_tokens,
            temperature: upstream.temperature,
        }
    }
}
