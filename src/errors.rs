//! Error types for MechanicBuddy
//!
//! Load failures abort startup, upstream failures abort the current request.
//! "Nothing to diagnose" outcomes are not errors and never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the diagnostic engine and streaming relay
#[derive(Error, Debug)]
pub enum DiagError {
    /// Tabular source file does not exist or cannot be opened
    #[error("Record source not found: {}", path.display())]
    SourceMissing { path: PathBuf },

    /// Header row missing or unparsable
    #[error("Cannot read header of {}: {reason}", path.display())]
    HeaderUnreadable { path: PathBuf, reason: String },

    /// Delimited-text errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream stream broke mid-response
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Transcript store errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiagError {
    /// True for failures that happened while talking to the upstream service
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DiagError::UpstreamStatus { .. } | DiagError::Http(_) | DiagError::Streaming(_)
        )
    }

    /// True for failures raised while loading the record sources
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            DiagError::SourceMissing { .. } | DiagError::HeaderUnreadable { .. } | DiagError::Csv(_)
        )
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, DiagError>;
