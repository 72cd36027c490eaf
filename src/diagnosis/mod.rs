//! Diagnosis module
//!
//! Free-text parsing, year-to-generation mapping and the two-stage
//! fault/fix lookup against the record store.

pub mod generation;
pub mod matcher;
pub mod parser;
pub mod types;

// Re-export commonly used types
pub use generation::{generation_of, Generation};
pub use matcher::IssueMatcher;
pub use parser::parse_message;
pub use types::{Diagnosis, Finding, NoMatchReason, ParsedMessage, VehicleQuery};
