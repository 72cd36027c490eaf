//! Record store module
//!
//! Issue and step records loaded once from two tabular sources and shared
//! read-only across every request.

pub mod loader;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use loader::{write_issues, write_steps, Table};
pub use store::RecordStore;
pub use types::{IssueRecord, StepRecord};
