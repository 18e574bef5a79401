//! Custom assertion helpers for testing
//!
//! Provides specialized assertions for:
//! - Wizard step and phase checks with clear error messages
//! - Validation error field sets
//! - Tracker terminal states
//! - Wire payload shape

use std::collections::BTreeSet;
use std::fmt::Debug;

use agent_core::tracker::{JobState, Progress, TrackerPhase};
use agent_core::wizard::{Wizard, WizardError, WizardPhase, WizardStep};
use agent_core::{AgentError, GenerationJobRecord, ProfileField, ValidationErrors};

/// Assert the wizard sits on `step` in the given phase
pub fn assert_wizard_at(wizard: &Wizard, step: WizardStep, phase: &WizardPhase) {
    assert_eq!(
        wizard.current_step(),
        step,
        "Wizard is on step '{}', expected '{}'",
        wizard.current_step(),
        step
    );
    assert_eq!(wizard.phase(), phase, "Wizard phase doesn't match expected");
}

/// Assert the errors name exactly `fields`, in any order
pub fn assert_validation_fields(errors: &ValidationErrors, fields: &[ProfileField]) {
    let actual: BTreeSet<ProfileField> = errors.fields().into_iter().collect();
    let expected: BTreeSet<ProfileField> = fields.iter().copied().collect();
    assert_eq!(
        actual, expected,
        "Validation errors don't match expected fields: {errors}"
    );
}

/// Assert a wizard operation was rejected for exactly `fields`
pub fn assert_invalid<T: Debug>(result: Result<T, WizardError>, fields: &[ProfileField]) {
    match result {
        Err(WizardError::Invalid(errors)) => assert_validation_fields(&errors, fields),
        other => panic!("Expected validation failure on {fields:?}, got: {other:?}"),
    }
}

/// Assert the tracker settled in `phase`
pub fn assert_phase<T: Debug>(state: &JobState<T>, phase: TrackerPhase) {
    assert_eq!(
        state.phase(),
        phase,
        "Tracker phase doesn't match expected (state: {state:?})"
    );
}

/// Assert the tracker completed with the given result
pub fn assert_job_completed<T: Debug + PartialEq>(state: &JobState<T>, expected: &T) {
    assert_phase(state, TrackerPhase::Completed);
    assert_eq!(state.result(), Some(expected), "Completed job carries the wrong result");
    assert!(state.error().is_none(), "Completed job should not carry an error");
    assert!(state.completed_at().is_some(), "Completed job should have completed_at");
}

/// Assert the tracker failed with a server-reported message
pub fn assert_job_failed_with<T: Debug>(state: &JobState<T>, message: &str) {
    assert_phase(state, TrackerPhase::Failed);
    match state.error() {
        Some(AgentError::ServerReported(actual)) => {
            assert_eq!(actual, message, "Server-reported message doesn't match")
        }
        other => panic!("Expected a server-reported failure '{message}', got: {other:?}"),
    }
    assert!(state.result().is_none(), "Failed job should not carry a result");
}

/// Assert the tracker gave up on its polling budget
pub fn assert_job_timed_out<T: Debug>(state: &JobState<T>) {
    assert_phase(state, TrackerPhase::Failed);
    assert!(
        state.error().is_some_and(AgentError::is_timeout),
        "Expected a timeout, got: {:?}",
        state.error()
    );
}

/// Assert observed progress values never decrease and stay within 0..=100
pub fn assert_progress_monotonic(observed: &[Progress]) {
    let percents: Vec<u8> = observed.iter().filter_map(|p| p.percent()).collect();
    assert!(
        percents.iter().all(|p| *p <= 100),
        "Progress out of range: {percents:?}"
    );
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "Progress went backwards: {percents:?}"
    );
}

/// Assert a JSON object has exactly the given top-level keys
pub fn assert_json_keys(value: &serde_json::Value, keys: &[&str]) {
    let object = value
        .as_object()
        .unwrap_or_else(|| panic!("Expected a JSON object, got: {value}"));
    let actual: BTreeSet<&str> = object.keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = keys.iter().copied().collect();
    assert_eq!(actual, expected, "JSON keys don't match expected");
}

/// Assert jobs are ordered newest first
pub fn assert_recent_first(jobs: &[GenerationJobRecord]) {
    for pair in jobs.windows(2) {
        assert!(
            pair[0].created_at >= pair[1].created_at,
            "Job {} created at {} listed before newer job {} created at {}",
            pair[0].job_id,
            pair[0].created_at,
            pair[1].job_id,
            pair[1].created_at
        );
    }
}
