//! Append-only decision log writer.
//!
//! Sole owner of the output file. One flushed JSON line per decision, so
//! concurrent external readers never observe a torn record. Write failures
//! are retried with bounded exponential backoff; losing a decision is not
//! acceptable, so this is the one failure class allowed to block progress.
//! Retries re-attempt the write only, never the decision.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use triage_common::TriageDecision;

pub struct DecisionSink {
    path: PathBuf,
    file: File,
    retry_max: u32,
    retry_base: Duration,
}

impl DecisionSink {
    pub fn new(path: &Path, retry_max: u32, retry_base: Duration) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output dir {}", dir.display()))?;
        }
        let file = Self::open(path)?;
        info!("Decision sink writing to {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
            retry_max,
            retry_base,
        })
    }

    fn open(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open output log {}", path.display()))
    }

    /// Append one decision as a newline-delimited JSON record.
    ///
    /// Retries transient I/O failures with exponential backoff, reopening
    /// the file between attempts (the handle may be stale after e.g. a
    /// volume remount). Exhausting the retries means persistence is
    /// unavailable: that error escalates to the daemon level.
    pub async fn append(&mut self, decision: &TriageDecision) -> Result<()> {
        let line = serde_json::to_string(decision).context("failed to serialize decision")?;

        let mut attempt = 0u32;
        loop {
            match self.try_write(&line) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry_max => {
                    attempt += 1;
                    let delay = self.retry_base * 2u32.saturating_pow(attempt - 1);
                    error!(
                        "Append failed for patient {} (attempt {}/{}): {}; retrying in {:?}",
                        decision.patient_summary.id, attempt, self.retry_max, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    if let Ok(file) = Self::open(&self.path) {
                        self.file = file;
                    }
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "persistence unavailable after {} attempts for patient {}",
                            self.retry_max, decision.patient_summary.id
                        )
                    });
                }
            }
        }
    }

    fn try_write(&mut self, line: &str) -> std::io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_common::{
        AlertBlock, AlertLevel, PatientSummary, Priority, ResourceDecision, TriageAssessment,
    };

    fn decision(id: &str) -> TriageDecision {
        TriageDecision {
            patient_summary: PatientSummary {
                id: id.to_string(),
                name: "Test".to_string(),
            },
            triage: TriageAssessment {
                priority: Priority::Low,
                reasoning: "ok".to_string(),
            },
            resource_decision: ResourceDecision {
                icu_required: "No".to_string(),
                icu_assigned: "None".to_string(),
                doctor_assigned: "Dr. A".to_string(),
                nurse_assigned: "N. B".to_string(),
            },
            alerts: AlertBlock {
                level: AlertLevel::Normal,
                message: "none".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_one_line_per_decision_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/triage_decisions.jsonl");
        let mut sink = DecisionSink::new(&path, 3, Duration::from_millis(1)).unwrap();

        sink.append(&decision("P1")).await.unwrap();
        sink.append(&decision("P2")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: TriageDecision = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.patient_summary.id, "P1");
        let second: TriageDecision = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.patient_summary.id, "P2");
    }

    #[tokio::test]
    async fn test_appends_never_rewrite_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage_decisions.jsonl");
        let mut sink = DecisionSink::new(&path, 3, Duration::from_millis(1)).unwrap();

        sink.append(&decision("P1")).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        sink.append(&decision("P2")).await.unwrap();
        let after = std::fs::read_to_string(&path).unwrap();
        assert!(after.starts_with(&before));
    }

    #[tokio::test]
    async fn test_reopens_after_handle_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage_decisions.jsonl");
        let mut sink = DecisionSink::new(&path, 3, Duration::from_millis(1)).unwrap();
        sink.append(&decision("P1")).await.unwrap();

        // Existing content survives a new sink over the same path.
        let mut sink2 = DecisionSink::new(&path, 3, Duration::from_millis(1)).unwrap();
        sink2.append(&decision("P2")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_transient_write_failure_retries_until_the_record_lands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage_decisions.jsonl");
        std::fs::write(&path, "").unwrap();

        // A read-only handle makes the first write attempt fail; the retry
        // reopens the path in append mode and succeeds.
        let mut sink = DecisionSink {
            path: path.clone(),
            file: File::open(&path).unwrap(),
            retry_max: 3,
            retry_base: Duration::from_millis(1),
        };

        sink.append(&decision("P1")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1, "record lands exactly once despite retries");
        let written: TriageDecision = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(written.patient_summary.id, "P1");
    }

    #[tokio::test]
    async fn test_exhausted_retries_escalate() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("seed");
        std::fs::write(&seed, "").unwrap();

        // Read-only handle plus a reopen path whose directory does not
        // exist: every attempt fails.
        let mut sink = DecisionSink {
            path: dir.path().join("missing").join("triage_decisions.jsonl"),
            file: File::open(&seed).unwrap(),
            retry_max: 2,
            retry_base: Duration::from_millis(1),
        };

        let err = sink.append(&decision("P1")).await.unwrap_err();
        assert!(err.to_string().contains("persistence unavailable"));
        assert_eq!(std::fs::read_to_string(&seed).unwrap(), "");
    }
}
