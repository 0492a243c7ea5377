//! Hospital resource state resolution.
//!
//! The resource log is append-only; the current state is simply the last
//! syntactically valid record. The reader scans only bytes appended since
//! the previous call and keeps the last known good snapshot, so a
//! temporarily unreadable log or a malformed tail line never disturbs the
//! pipeline.

use crate::tailer::LogTailer;
use std::path::Path;
use tracing::debug;
use triage_common::ResourceSnapshot;

pub struct ResourceStateReader {
    tailer: LogTailer,
    current: ResourceSnapshot,
}

impl ResourceStateReader {
    pub fn new(path: &Path) -> Self {
        Self {
            tailer: LogTailer::from_start(path),
            current: ResourceSnapshot::default(),
        }
    }

    /// The most recent valid snapshot, default if none has ever been seen.
    pub fn latest(&mut self) -> ResourceSnapshot {
        for line in self.tailer.poll_lines() {
            match serde_json::from_str::<ResourceSnapshot>(&line) {
                Ok(snapshot) => self.current = snapshot,
                Err(e) => {
                    debug!("Skipping invalid resource record: {}", e);
                }
            }
        }
        self.current.clone()
    }
}
