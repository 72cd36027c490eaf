//! Transcript stores
//!
//! The file store keeps one JSON-lines file per user under the storage
//! directory; both entries of an exchange are written with a single append.

use crate::errors::{DiagError, Result};
use crate::history::types::{ChatEntry, ChatExchange, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Append-only storage for completed exchanges
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Store both entries of an exchange
    async fn append(&self, exchange: ChatExchange) -> Result<()>;

    /// A user's entries ordered by timestamp
    async fn history(&self, user: &UserId) -> Result<Vec<ChatEntry>>;
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Base directory for transcript files
    pub storage_dir: PathBuf,
}

/// JSON-lines transcript store on local disk
pub struct JsonlTranscriptStore {
    config: PersistenceConfig,
    write_lock: Mutex<()>,
}

impl JsonlTranscriptStore {
    /// Create store, making the storage directory if needed
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        if !config.storage_dir.exists() {
            std::fs::create_dir_all(&config.storage_dir).map_err(|e| {
                DiagError::Persistence(format!("Failed to create history directory: {}", e))
            })?;
        }

        Ok(Self {
            config,
            write_lock: Mutex::new(()),
        })
    }

    fn user_path(&self, user: &UserId) -> PathBuf {
        self.config
            .storage_dir
            .join(format!("history_{}.jsonl", user.as_str()))
    }

    pub fn storage_dir(&self) -> &PathBuf {
        &self.config.storage_dir
    }
}

#[async_trait]
impl TranscriptStore for JsonlTranscriptStore {
    async fn append(&self, exchange: ChatExchange) -> Result<()> {
        let path = self.user_path(exchange.user_id());
        let id = exchange.id;

        let mut batch = String::new();
        for entry in exchange.into_entries() {
            batch.push_str(&serde_json::to_string(&entry)?);
            batch.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| DiagError::Persistence(format!("Failed to open history file: {}", e)))?;

        file.write_all(batch.as_bytes())
            .await
            .map_err(|e| DiagError::Persistence(format!("Failed to write history file: {}", e)))?;
        file.flush().await?;

        debug!(exchange = %id, path = %path.display(), "exchange persisted");
        Ok(())
    }

    async fn history(&self, user: &UserId) -> Result<Vec<ChatEntry>> {
        let path = self.user_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DiagError::Persistence(format!("Failed to read history file: {}", e)))?;

        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str::<ChatEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(user = %user, line = index + 1, error = %e, "skipping corrupt history line");
                }
            }
        }

        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }
}

/// Process-local store, for tests and single-run CLI sessions
#[derive(Default)]
pub struct InMemoryTranscriptStore {
    entries: Mutex<HashMap<UserId, Vec<ChatEntry>>>,
    appends: Mutex<usize>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of exchanges appended so far
    pub async fn append_count(&self) -> usize {
        *self.appends.lock().await
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append(&self, exchange: ChatExchange) -> Result<()> {
        let user = exchange.user_id().clone();
        let mut entries = self.entries.lock().await;
        entries.entry(user).or_default().extend(exchange.into_entries());
        *self.appends.lock().await += 1;
        Ok(())
    }

    async fn history(&self, user: &UserId) -> Result<Vec<ChatEntry>> {
        let entries = self.entries.lock().await;
        let mut list = entries.get(user).cloned().unwrap_or_default();
        list.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(list)
    }
}
