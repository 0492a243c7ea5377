//! Triage Daemon - Streaming healthcare triage pipeline.
//!
//! Tails the patient intake log, resolves the latest hospital resource
//! snapshot plus the guidelines document, asks the reasoning service for a
//! structured decision, falls back to the deterministic rule engine on any
//! reasoning failure, and appends one decision per patient to the output log.

pub mod config;
pub mod fallback;
pub mod guidelines;
pub mod pipeline;
pub mod reasoning;
pub mod resources;
pub mod sink;
pub mod tailer;
