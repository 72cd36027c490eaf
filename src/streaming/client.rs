//! Upstream text-generation client
//!
//! Opens a streaming chat-completion request and hands back the raw response
//! body as a byte stream. Only the connect phase has a timeout; generation can
//! take as long as the model needs.

use crate::config::UpstreamConfig;
use crate::errors::{DiagError, Result};
use crate::prompt::ChatPayload;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Default upstream endpoint
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:11434/v1/chat/completions";

/// Default model
pub const DEFAULT_MODEL: &str = "mistral";

/// Raw response body of an upstream generation call
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Something that can open a streaming generation call
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Start generation; dropping the returned stream cancels the call
    async fn open(&self, payload: &ChatPayload) -> Result<ByteStream>;
}

/// HTTP upstream speaking the OpenAI-compatible chat-completions protocol
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    url: String,
}

impl HttpUpstream {
    /// Create client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(&UpstreamConfig::default())
    }

    /// Create client from upstream configuration
    pub fn with_config(config: &UpstreamConfig) -> Result<Self> {
        Self::with_url(&config.url, config.connect_timeout())
    }

    pub fn with_url(url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(DiagError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn open(&self, payload: &ChatPayload) -> Result<ByteStream> {
        debug!(url = %self.url, model = %payload.model, "opening upstream stream");

        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(DiagError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "upstream rejected request");
            return Err(DiagError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| DiagError::Streaming(e.to_string())));

        Ok(Box::pin(stream))
    }
}
