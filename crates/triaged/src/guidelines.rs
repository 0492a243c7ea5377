//! Triage-policy guidelines document.
//!
//! Read fresh on every decision so operators can hot-update the policy
//! without restarting the daemon. A missing document means empty guidance,
//! never an error.

use std::path::{Path, PathBuf};

pub struct GuidelineStore {
    path: PathBuf,
}

impl GuidelineStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn text(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }
}
