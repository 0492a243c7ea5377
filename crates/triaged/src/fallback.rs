//! Deterministic rule-based fallback triage.
//!
//! The safety net: whenever the reasoning call is unavailable or malformed,
//! this engine produces a decision with the exact same schema as the primary
//! path. Pure function, no I/O, cannot fail. Keyword rules are evaluated in
//! fixed precedence order against the symptoms text; first match wins.

use triage_common::{
    AlertBlock, AlertLevel, PatientRecord, PatientSummary, Priority, ResourceDecision,
    TriageAssessment, TriageDecision,
};

/// Rule 1: any of these marks the patient critical.
const CRITICAL_KEYWORDS: &[&str] = &["chest pain", "severe", "difficulty breathing"];

/// Rule 2: suspected fracture.
const FRACTURE_KEYWORDS: &[&str] = &["broken", "fracture"];

/// Placeholder assignments signaling that a human must resolve the actual
/// resource allocation.
const ICU_PENDING: &str = "Pending Check";
const DOCTOR_ON_CALL: &str = "On Call";
const NURSE_NEXT: &str = "Next Available";

/// Audit suffix keeps at most this many characters of the failure text.
const FAILURE_EXCERPT_MAX: usize = 50;

/// Produce a rule-based decision for a patient after a reasoning failure.
///
/// `failure` describes why the primary path was skipped; a truncated excerpt
/// is appended to the reasoning text for auditability.
pub fn decide(patient: &PatientRecord, failure: &str) -> TriageDecision {
    let symptoms = patient.symptoms.to_lowercase();

    let (priority, reasoning, icu_required) = if contains_any(&symptoms, CRITICAL_KEYWORDS) {
        (
            Priority::Critical,
            "Fallback: Critical keywords detected in symptoms.",
            "Yes",
        )
    } else if contains_any(&symptoms, FRACTURE_KEYWORDS) {
        (Priority::Medium, "Fallback: Potential fracture detected.", "No")
    } else {
        (Priority::Low, "Fallback: Minor symptoms detected.", "No")
    };

    let alert_level = if priority == Priority::Critical {
        AlertLevel::Urgent
    } else {
        AlertLevel::Normal
    };

    TriageDecision {
        patient_summary: PatientSummary {
            id: patient.id.clone(),
            name: patient.name.clone(),
        },
        triage: TriageAssessment {
            priority,
            reasoning: format!(
                "{} (Auto-generated due to reasoning failure: {})",
                reasoning,
                excerpt(failure)
            ),
        },
        resource_decision: ResourceDecision {
            icu_required: icu_required.to_string(),
            icu_assigned: ICU_PENDING.to_string(),
            doctor_assigned: DOCTOR_ON_CALL.to_string(),
            nurse_assigned: NURSE_NEXT.to_string(),
        },
        alerts: AlertBlock {
            level: alert_level,
            message: format!("System Alert: Fallback mode used for {}", patient.name),
        },
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// First `FAILURE_EXCERPT_MAX` characters of the failure description,
/// char-boundary safe.
fn excerpt(failure: &str) -> String {
    if failure.chars().count() <= FAILURE_EXCERPT_MAX {
        failure.to_string()
    } else {
        let head: String = failure.chars().take(FAILURE_EXCERPT_MAX).collect();
        format!("{}...", head)
    }
}
