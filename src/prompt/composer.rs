//! Prompt composer
//!
//! Two shapes only: a structured mechanic prompt when a fault and recommendation
//! were found, otherwise the raw message with a generic assistant persona.

use crate::diagnosis::{Diagnosis, Finding};
use serde::Serialize;

pub const EXPERT_SYSTEM_ROLE: &str = "You are an expert mechanic assistant.";
pub const GENERIC_SYSTEM_ROLE: &str = "You are a helpful assistant.";

/// Follow-up instructions appended to every diagnosed prompt
const FOLLOW_UPS: [&str; 3] = [
    "1) Provide any extra tips.",
    "2) Suggest two alternative methods with pros and cons.",
    "3) At the beginning of the chat write Asik",
];

/// System role and user prompt for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPlan {
    pub system_role: String,
    pub user_prompt: String,
}

impl PromptPlan {
    pub fn is_expert(&self) -> bool {
        self.system_role == EXPERT_SYSTEM_ROLE
    }
}

fn diagnosed_prompt(finding: &Finding) -> String {
    let query = &finding.query;
    let mut prompt = format!(
        "I have a {} {} with symptom “{}”.\nFault diagnosed: {}.\nDB recommendation: {}\n\nStep-by-step guide:\n{}\n\n",
        query.brand(),
        query.year(),
        query.symptom(),
        finding.fault,
        finding.recommendation,
        finding.how_to_fix.as_deref().unwrap_or(""),
    );

    for line in FOLLOW_UPS {
        prompt.push_str(line);
        prompt.push('\n');
    }

    prompt
}

/// Compose the prompt for a raw message and its diagnosis
pub fn compose_prompt(raw_message: &str, diagnosis: &Diagnosis) -> PromptPlan {
    match diagnosis.finding() {
        Some(finding) if !finding.fault.is_empty() && !finding.recommendation.is_empty() => {
            PromptPlan {
                system_role: EXPERT_SYSTEM_ROLE.to_string(),
                user_prompt: diagnosed_prompt(finding),
            }
        }
        _ => PromptPlan {
            system_role: GENERIC_SYSTEM_ROLE.to_string(),
            user_prompt: raw_message.to_string(),
        },
    }
}
