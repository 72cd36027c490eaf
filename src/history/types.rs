//! Transcript types

use crate::errors::{DiagError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

/// Authenticated caller identity, as handed over by the outer layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Ids are used in file names, so only `[A-Za-z0-9_-]`, at most 64 chars
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= 64
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(id))
        } else {
            Err(DiagError::Persistence(format!("invalid user id: {:?}", id)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub user_id: UserId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// History listing shape: who said it and what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub sender: String,
    pub text: String,
}

impl From<&ChatEntry> for HistoryItem {
    fn from(entry: &ChatEntry) -> Self {
        Self {
            sender: entry.role.as_str().to_string(),
            text: entry.content.clone(),
        }
    }
}

/// A completed question/answer pair, stored exactly once
///
/// Not `Clone`: stores take it by value, so the same exchange cannot be
/// handed over twice.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub id: Uuid,
    pub user: ChatEntry,
    pub assistant: ChatEntry,
}

static LAST_TIMESTAMP: Mutex<Option<DateTime<Utc>>> = Mutex::new(None);

/// Wall-clock time, bumped forward so successive calls strictly increase
fn next_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    let mut last = match LAST_TIMESTAMP.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    let ts = match *last {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    };
    *last = Some(ts);
    ts
}

impl ChatExchange {
    pub fn new(user_id: UserId, question: impl Into<String>, answer: impl Into<String>) -> Self {
        let asked_at = next_timestamp();
        let answered_at = next_timestamp();

        Self {
            id: Uuid::new_v4(),
            user: ChatEntry {
                user_id: user_id.clone(),
                role: Role::User,
                content: question.into(),
                timestamp: asked_at,
            },
            assistant: ChatEntry {
                user_id,
                role: Role::Assistant,
                content: answer.into(),
                timestamp: answered_at,
            },
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.user_id
    }

    /// Entries in storage order
    pub fn into_entries(self) -> [ChatEntry; 2] {
        [self.user, self.assistant]
    }
}
