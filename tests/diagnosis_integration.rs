//! Integration tests for loading, parsing, matching and prompt composition
//!
//! Runs against the bundled sample sources and against generated temp files.

use mechanicbuddy::{
    compose_prompt,
    diagnosis::{Diagnosis, NoMatchReason},
    parse_message,
    prompt::{EXPERT_SYSTEM_ROLE, GENERIC_SYSTEM_ROLE},
    records::{write_issues, write_steps, RecordStore, Table},
    DiagError, IssueMatcher,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn sample_store() -> RecordStore {
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    RecordStore::load(&data.join("car_issues.csv"), &data.join("step_by_step.csv")).unwrap()
}

fn diagnose(store: &RecordStore, message: &str) -> Diagnosis {
    IssueMatcher::new(store).diagnose_message(&parse_message(message))
}

#[test]
fn test_sample_sources_load() {
    let store = sample_store();
    assert_eq!(store.issues().len(), 8);
    assert_eq!(store.steps().len(), 5);

    // Whole-line quotes are gone, inner quoting still honoured
    assert_eq!(store.issues()[0].brand, "Toyota");
    assert_eq!(store.issues()[6].symptom, "shudder, then slip between gears");

    // Stray trailing quotes stripped from procedures
    assert!(store.steps().iter().all(|s| !s.how_to_fix.ends_with('"')));
}

#[test]
fn test_end_to_end_match_and_prompt() {
    let store = sample_store();
    let message = "Toyota 2015 rattling noise";
    let diagnosis = diagnose(&store, message);

    assert_eq!(diagnosis.fault(), Some("Worn front strut mount"));
    assert!(diagnosis.how_to_fix().unwrap().starts_with("1. Loosen the wheel nuts"));

    let plan = compose_prompt(message, &diagnosis);
    assert_eq!(plan.system_role, EXPERT_SYSTEM_ROLE);
    assert!(plan.user_prompt.starts_with("I have a Toyota 2015 with symptom “rattling noise”."));
    assert!(plan.user_prompt.contains("Fault diagnosed: Worn front strut mount."));
    assert!(plan.user_prompt.ends_with("3) At the beginning of the chat write Asik\n"));
}

#[test]
fn test_generation_selects_record() {
    let store = sample_store();
    let older = diagnose(&store, "Toyota 2009 rattling noise");
    assert_eq!(older.fault(), Some("Worn sway bar end link"));
}

#[test]
fn test_quoted_symptom_with_comma_matches() {
    let store = sample_store();
    let diagnosis = diagnose(&store, "Ford 2014 shudder, then slip");
    assert_eq!(diagnosis.fault(), Some("Worn dual-clutch packs"));
    assert_eq!(diagnosis.how_to_fix(), None);

    let plan = compose_prompt("Ford 2014 shudder, then slip", &diagnosis);
    assert_eq!(plan.system_role, EXPERT_SYSTEM_ROLE);
    assert!(plan.user_prompt.contains("Step-by-step guide:\n\n\n"));
}

#[test]
fn test_unmatched_messages_fall_back() {
    let store = sample_store();

    for (message, reason) in [
        ("my car won't start", NoMatchReason::MissingBrand),
        ("Toyota 1999 rattling noise", NoMatchReason::NoGeneration),
        ("Toyota 2024 rattling noise", NoMatchReason::NoGeneration),
        ("Toyota 2015 smells like maple syrup", NoMatchReason::NoIssue),
    ] {
        let diagnosis = diagnose(&store, message);
        assert_eq!(diagnosis, Diagnosis::NoMatch { reason }, "message: {}", message);

        let plan = compose_prompt(message, &diagnosis);
        assert_eq!(plan.system_role, GENERIC_SYSTEM_ROLE);
        assert_eq!(plan.user_prompt, message);
    }
}

#[test]
fn test_brand_prefix_matching() {
    let store = sample_store();

    // The typed brand is a prefix of the stored brand
    assert!(diagnose(&store, "toy 2015 rattling").is_found());
    assert!(diagnose(&store, "VOLKS 2013 rough idle").is_found());

    // The stored brand is a prefix of the typed brand
    let corolla = diagnose(&store, "Toyota Corolla 2015 rattling");
    assert_eq!(corolla.fault(), Some("Worn front strut mount"));

    // Neither is a prefix of the other
    assert!(!diagnose(&store, "yota 2015 rattling").is_found());
}

#[test]
fn test_round_trip_preserves_fields() {
    let store = sample_store();
    let temp = TempDir::new().unwrap();
    let issues_path = temp.path().join("issues.csv");
    let steps_path = temp.path().join("steps.csv");

    write_issues(store.issues(), fs::File::create(&issues_path).unwrap()).unwrap();
    write_steps(store.steps(), fs::File::create(&steps_path).unwrap()).unwrap();

    let reloaded = RecordStore::load(&issues_path, &steps_path).unwrap();
    assert_eq!(reloaded.issues(), store.issues());
    assert_eq!(reloaded.steps(), store.steps());
}

#[test]
fn test_malformed_rows_degrade() {
    let temp = TempDir::new().unwrap();
    let issues: PathBuf = temp.path().join("issues.csv");
    let steps: PathBuf = temp.path().join("steps.csv");
    fs::write(
        &issues,
        "Brand,Generation,Symptom,Fault,Recommendation\nToyota\nHonda,third,squeal,Belt,Replace\nFord,2,grind,Pads,Replace pads\n",
    )
    .unwrap();
    fs::write(&steps, "Brand,Generation,Fault,How_to_Fix\n").unwrap();

    let store = RecordStore::load(&issues, &steps).unwrap();
    assert_eq!(store.issues().len(), 3);
    assert_eq!(store.issues()[0].symptom, "");
    assert_eq!(store.issues()[1].generation, 0);
    assert_eq!(store.issues()[2].fault, "Pads");
}

#[test]
fn test_missing_header_is_fatal() {
    let temp = TempDir::new().unwrap();
    let empty = temp.path().join("empty.csv");
    fs::write(&empty, "\n\n").unwrap();

    let err = Table::read(&empty).unwrap_err();
    assert!(matches!(err, DiagError::HeaderUnreadable { .. }));
    assert!(err.is_load_error());
}
