//! Typed values flowing between parser, matcher and prompt composer

use crate::diagnosis::generation::Generation;
use serde::{Deserialize, Serialize};

/// Brand, year and symptom split out of a raw chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub brand: Option<String>,
    pub year: Option<i32>,
    pub symptom: String,
}

/// Why no diagnosis was attempted or found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    MissingBrand,
    NoYear,
    EmptySymptom,
    NoGeneration,
    NoIssue,
}

/// A query the matcher can actually run: every part present, generation resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleQuery {
    brand: String,
    year: i32,
    generation: Generation,
    symptom: String,
}

impl VehicleQuery {
    /// Check matcher preconditions
    pub fn new(
        brand: Option<&str>,
        symptom: &str,
        year: Option<i32>,
    ) -> Result<Self, NoMatchReason> {
        let brand = brand
            .filter(|b| !b.is_empty())
            .ok_or(NoMatchReason::MissingBrand)?;
        let year = year.ok_or(NoMatchReason::NoYear)?;
        if symptom.is_empty() {
            return Err(NoMatchReason::EmptySymptom);
        }
        let generation = Generation::from_year(year).ok_or(NoMatchReason::NoGeneration)?;

        Ok(Self {
            brand: brand.to_string(),
            year,
            generation,
            symptom: symptom.to_string(),
        })
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn symptom(&self) -> &str {
        &self.symptom
    }
}

impl ParsedMessage {
    /// Build the matcher query, or explain why there is nothing to diagnose
    pub fn query(&self) -> Result<VehicleQuery, NoMatchReason> {
        VehicleQuery::new(self.brand.as_deref(), &self.symptom, self.year)
    }
}

/// Fault and recommendation found for a query, plus the fix procedure if one exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub query: VehicleQuery,
    pub fault: String,
    pub recommendation: String,
    pub how_to_fix: Option<String>,
}

/// Outcome of the matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Diagnosis {
    Found(Finding),
    NoMatch { reason: NoMatchReason },
}

impl Diagnosis {
    pub fn no_match(reason: NoMatchReason) -> Self {
        Diagnosis::NoMatch { reason }
    }

    pub fn finding(&self) -> Option<&Finding> {
        match self {
            Diagnosis::Found(finding) => Some(finding),
            Diagnosis::NoMatch { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.finding().is_some()
    }

    pub fn fault(&self) -> Option<&str> {
        self.finding().map(|f| f.fault.as_str())
    }

    pub fn recommendation(&self) -> Option<&str> {
        self.finding().map(|f| f.recommendation.as_str())
    }

    pub fn how_to_fix(&self) -> Option<&str> {
        self.finding().and_then(|f| f.how_to_fix.as_deref())
    }
}
