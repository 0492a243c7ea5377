//! The streaming triage pipeline.
//!
//! Long-running loop: tail the patient log, and for each record walk
//! Read -> ContextResolved -> ReasoningAttempted -> {Decided | FellBack} ->
//! Persisted. Every valid patient record yields exactly one decision, in
//! read order; reasoning failures of any kind route to the fallback engine
//! and never abort a patient. Malformed input lines are skipped.

use crate::config::Config;
use crate::fallback;
use crate::guidelines::GuidelineStore;
use crate::reasoning::ReasoningClient;
use crate::resources::ResourceStateReader;
use crate::sink::DecisionSink;
use crate::tailer::{FileWatch, LogTailer};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use triage_common::{PatientRecord, TriageDecision};

pub struct TriagePipeline {
    tailer: LogTailer,
    patients_path: PathBuf,
    resources: ResourceStateReader,
    guidelines: GuidelineStore,
    client: Box<dyn ReasoningClient>,
    sink: DecisionSink,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl TriagePipeline {
    pub fn new(
        config: &Config,
        client: Box<dyn ReasoningClient>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let paths = &config.paths;
        let tailer = if config.pipeline.from_start {
            LogTailer::from_start(&paths.patients_file)
        } else {
            LogTailer::from_end(&paths.patients_file)
        };
        let sink = DecisionSink::new(
            &paths.output_file,
            config.pipeline.persist_retry_max,
            Duration::from_millis(config.pipeline.persist_retry_base_ms),
        )?;

        Ok(Self {
            tailer,
            patients_path: paths.patients_file.clone(),
            resources: ResourceStateReader::new(&paths.resources_file),
            guidelines: GuidelineStore::new(&paths.guidelines_file),
            client,
            sink,
            poll_interval: config.poll_interval(),
            shutdown,
        })
    }

    /// Run until shutdown is signalled. Records already read when the signal
    /// arrives are still decided and persisted; no decision is left
    /// half-written.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Triage pipeline monitoring {} for new patients",
            self.patients_path.display()
        );

        // Event-driven wakeup where the platform supports it; the bounded
        // poll interval covers the rest.
        let mut growth = match FileWatch::new(&self.patients_path) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!("File watching unavailable ({}), polling only", e);
                None
            }
        };

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let lines = self.tailer.poll_lines();
            if lines.is_empty() {
                let interval = self.poll_interval;
                tokio::select! {
                    res = self.shutdown.changed() => {
                        if res.is_err() {
                            break;
                        }
                    }
                    _ = wait_for_growth(&mut growth, interval) => {}
                }
                continue;
            }

            for line in lines {
                // Read: a line that does not parse is skipped, not retried,
                // never fatal.
                let patient = match serde_json::from_str::<PatientRecord>(&line) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("Skipping invalid patient record: {}", e);
                        continue;
                    }
                };

                info!("Processing patient {}", patient.id);
                let decision = self.decide(&patient).await;

                // Persisted: the only externally observable commit point.
                self.sink.append(&decision).await?;
                info!(
                    "Decision logged for {}: {} ({})",
                    patient.id,
                    decision.triage.priority.as_str(),
                    if decision.is_fallback() { "fallback" } else { "reasoned" }
                );
            }
        }

        info!("Triage pipeline stopped");
        Ok(())
    }

    /// ContextResolved -> ReasoningAttempted -> {Decided | FellBack}.
    /// Always yields a decision; reasoning failures route to fallback with
    /// the caught failure description.
    async fn decide(&mut self, patient: &PatientRecord) -> TriageDecision {
        let guidelines = self.guidelines.text();
        let snapshot = self.resources.latest();
        debug!(
            "Context resolved for {}: {} ICU beds available",
            patient.id, snapshot.icu_beds_available
        );

        match self.client.decide(patient, &guidelines, &snapshot).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    "Reasoning failed for {} ({}), using fallback: {}",
                    patient.id,
                    e.kind(),
                    e
                );
                fallback::decide(patient, &e.to_string())
            }
        }
    }
}

async fn wait_for_growth(growth: &mut Option<FileWatch>, interval: Duration) {
    match growth {
        Some(watch) => watch.wait(interval).await,
        None => tokio::time::sleep(interval).await,
    }
}
