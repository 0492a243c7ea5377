//! Data model for the streaming triage pipeline.
//!
//! Three record families: patient intake events (input log), hospital
//! resource snapshots (resource log), and triage decisions (output log).
//! All are newline-delimited JSON on disk.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One patient intake event, consumed exactly once in arrival order.
///
/// Producers write `patient_id` on the wire. Vitals and labs are free-form
/// scalar maps ("bp": "180/100", "hr": 90); `BTreeMap` keeps their order
/// stable so identical records build identical reasoning payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "patient_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub vitals: BTreeMap<String, Value>,
    #[serde(default)]
    pub labs: BTreeMap<String, Value>,
}

/// Doctor roster as it appears in resource snapshots.
///
/// Producers emit either a flat name list or a specialty-keyed map; both
/// shapes must flow through the pipeline uniformly. `names()` is the single
/// normalization point for consumers that want a flat list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DoctorRoster {
    BySpecialty(BTreeMap<String, Vec<String>>),
    Flat(Vec<String>),
}

impl DoctorRoster {
    /// Flatten the roster to a list of names, deterministic order.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Flat(names) => names.clone(),
            Self::BySpecialty(by_specialty) => {
                by_specialty.values().flatten().cloned().collect()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(names) => names.is_empty(),
            Self::BySpecialty(by_specialty) => by_specialty.values().all(|v| v.is_empty()),
        }
    }
}

impl Default for DoctorRoster {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

/// Point-in-time hospital capacity, one per line in the resource log.
///
/// The pipeline always uses the last valid record (last-write-wins, no merge
/// across entries). Every field defaults so a sparse snapshot still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub icu_beds_total: u32,
    #[serde(default)]
    pub icu_beds_available: u32,
    #[serde(default)]
    pub general_wards_total: u32,
    #[serde(default)]
    pub general_wards_available: u32,
    #[serde(default)]
    pub nurses_available: u32,
    #[serde(default)]
    pub doctors_on_call: DoctorRoster,
}

/// Triage urgency scale, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Alert severity attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Normal,
    Urgent,
}

/// Who the decision is about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
}

/// The triage verdict itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub priority: Priority,
    pub reasoning: String,
}

/// Resource assignment block. `icu_required` is the bool-like "Yes"/"No"
/// string the downstream consumers expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDecision {
    pub icu_required: String,
    pub icu_assigned: String,
    pub doctor_assigned: String,
    pub nurse_assigned: String,
}

/// Alerting block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertBlock {
    pub level: AlertLevel,
    pub message: String,
}

/// One structured triage decision, appended exactly once per processed
/// patient and never mutated after write. The fallback path produces the
/// same shape as the primary path so consumers need no branching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageDecision {
    pub patient_summary: PatientSummary,
    pub triage: TriageAssessment,
    pub resource_decision: ResourceDecision,
    pub alerts: AlertBlock,
}

impl TriageDecision {
    /// True when the decision came from the rule-based safety net rather
    /// than the reasoning service. Dashboards count these.
    pub fn is_fallback(&self) -> bool {
        self.triage.reasoning.starts_with("Fallback:")
    }
}
