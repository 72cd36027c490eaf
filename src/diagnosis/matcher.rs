//! Two-stage issue matcher
//!
//! Stage 1 finds the first issue record whose brand and the input brand are
//! prefix-related, whose generation equals the mapped generation and whose
//! symptom text contains the input symptom. Stage 2 finds the first step record for that
//! exact fault. Both comparisons on brand and symptom ignore case; fault does not.
//!
//! Load order decides ties. There is no scoring.

use crate::diagnosis::generation::Generation;
use crate::diagnosis::types::{Diagnosis, Finding, NoMatchReason, ParsedMessage, VehicleQuery};
use crate::records::{IssueRecord, RecordStore, StepRecord};
use tracing::debug;

/// Matcher over a borrowed, read-only record store
#[derive(Debug, Clone, Copy)]
pub struct IssueMatcher<'a> {
    store: &'a RecordStore,
}

/// Either brand is a prefix of the other: "Toy" and "Toyota Corolla" both find "Toyota".
/// A blank stored brand never matches.
fn brand_matches(stored: &str, input_lower: &str) -> bool {
    let stored = stored.trim().to_lowercase();
    // Keep both directions: a one-way `stored.starts_with(input)` loses "Toyota Corolla"
    !stored.is_empty() && (stored.starts_with(input_lower) || input_lower.starts_with(&stored))
}

impl<'a> IssueMatcher<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Diagnose from loose parts; any missing part means no match
    pub fn diagnose(&self, brand: Option<&str>, symptom: &str, year: Option<i32>) -> Diagnosis {
        self.diagnose_checked(VehicleQuery::new(brand, symptom, year))
    }

    /// Diagnose a parsed chat message
    pub fn diagnose_message(&self, parsed: &ParsedMessage) -> Diagnosis {
        self.diagnose_checked(parsed.query())
    }

    fn diagnose_checked(&self, query: Result<VehicleQuery, NoMatchReason>) -> Diagnosis {
        match query {
            Ok(query) => self.match_query(query),
            Err(reason) => {
                debug!(?reason, "diagnosis skipped");
                Diagnosis::no_match(reason)
            }
        }
    }

    /// Run both stages for a query that already passed its preconditions
    pub fn match_query(&self, query: VehicleQuery) -> Diagnosis {
        let brand = query.brand().to_lowercase();
        let symptom = query.symptom().to_lowercase();
        let generation = query.generation();

        let issue = match self.find_issue(&brand, generation, &symptom) {
            Some(issue) if !issue.fault.is_empty() => issue,
            _ => {
                debug!(brand = query.brand(), %generation, "no issue record matched");
                return Diagnosis::no_match(NoMatchReason::NoIssue);
            }
        };

        let how_to_fix = self
            .find_step(&brand, generation, &issue.fault)
            .map(|step| step.how_to_fix.clone());

        debug!(
            fault = %issue.fault,
            has_fix = how_to_fix.is_some(),
            "issue matched"
        );

        Diagnosis::Found(Finding {
            fault: issue.fault.clone(),
            recommendation: issue.recommendation.clone(),
            how_to_fix,
            query,
        })
    }

    fn find_issue(
        &self,
        brand_lower: &str,
        generation: Generation,
        symptom_lower: &str,
    ) -> Option<&'a IssueRecord> {
        self.store.issues().iter().find(|issue| {
            brand_matches(&issue.brand, brand_lower)
                && generation.matches(issue.generation)
                && issue.symptom.to_lowercase().contains(symptom_lower)
        })
    }

    fn find_step(
        &self,
        brand_lower: &str,
        generation: Generation,
        fault: &str,
    ) -> Option<&'a StepRecord> {
        self.store.steps().iter().find(|step| {
            brand_matches(&step.brand, brand_lower)
                && step.fault == fault
                && generation.matches(step.generation)
        })
    }
}
