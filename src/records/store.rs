//! Process-wide record store
//!
//! Built once before any request is served. Nothing mutates it afterwards, so
//! requests share it through an `Arc` without locking.

use crate::errors::Result;
use crate::records::loader::Table;
use crate::records::types::{IssueRecord, StepRecord};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Immutable, ordered issue and step records
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    issues: Vec<IssueRecord>,
    steps: Vec<StepRecord>,
}

impl RecordStore {
    /// Load both tabular sources; any missing file or bad header is fatal
    pub fn load(issues_path: &Path, steps_path: &Path) -> Result<Self> {
        let issues = Table::read(issues_path)?.issues();
        let steps = Table::read(steps_path)?.steps();

        info!(
            issues = issues.len(),
            steps = steps.len(),
            "record store loaded"
        );

        Ok(Self { issues, steps })
    }

    /// Load and wrap for sharing between request handlers
    pub fn load_shared(issues_path: &Path, steps_path: &Path) -> Result<Arc<Self>> {
        Self::load(issues_path, steps_path).map(Arc::new)
    }

    /// Build directly from records, keeping their order
    pub fn from_records(issues: Vec<IssueRecord>, steps: Vec<StepRecord>) -> Self {
        Self { issues, steps }
    }

    /// Issue records in load order
    pub fn issues(&self) -> &[IssueRecord] {
        &self.issues
    }

    /// Step records in load order
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.steps.is_empty()
    }
}
