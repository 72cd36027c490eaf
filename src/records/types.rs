//! Record types for the repair database
//!
//! Field names on the wire follow the tabular sources (`Brand`, `Generation`,
//! `How_to_Fix`, ...). Step sources name the brand column `Vehicle`.

use crate::records::loader::Table;
use csv::StringRecord;
use serde::{Deserialize, Serialize};

/// One known fault for a brand/generation, found by symptom text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Generation")]
    pub generation: i32,
    #[serde(rename = "Symptom")]
    pub symptom: String,
    #[serde(rename = "Fault")]
    pub fault: String,
    #[serde(rename = "Recommendation")]
    pub recommendation: String,
}

/// Step-by-step fix procedure for a brand/generation/fault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(rename = "Vehicle")]
    pub brand: String,
    #[serde(rename = "Generation")]
    pub generation: i32,
    #[serde(rename = "Fault")]
    pub fault: String,
    #[serde(rename = "How_to_Fix")]
    pub how_to_fix: String,
}

/// Non-numeric generations load as 0, which no year maps to
pub(crate) fn parse_generation(raw: &str) -> i32 {
    raw.trim().parse().unwrap_or(0)
}

impl IssueRecord {
    pub fn from_row(table: &Table, row: &StringRecord) -> Self {
        Self {
            brand: table.field(row, "Brand").to_string(),
            generation: parse_generation(table.field(row, "Generation")),
            symptom: table.field(row, "Symptom").to_string(),
            fault: table.field(row, "Fault").to_string(),
            recommendation: table.field(row, "Recommendation").to_string(),
        }
    }
}

impl StepRecord {
    pub fn from_row(table: &Table, row: &StringRecord) -> Self {
        let vehicle = table.field(row, "Vehicle");
        let brand = if vehicle.is_empty() {
            table.field(row, "Brand")
        } else {
            vehicle
        };

        Self {
            brand: brand.to_string(),
            generation: parse_generation(table.field(row, "Generation")),
            fault: table.field(row, "Fault").to_string(),
            how_to_fix: table
                .field(row, "How_to_Fix")
                .trim_end_matches('"')
                .to_string(),
        }
    }
}
