//! Append-only log tailing.
//!
//! `LogTailer` keeps a byte-offset cursor into a newline-delimited log and
//! returns only the complete lines that appeared since the last poll. A
//! trailing partial line (writer mid-append) is buffered until its newline
//! arrives, so records are never split.
//!
//! `FileWatch` wakes the pipeline on file growth via inotify-style events,
//! with bounded-interval polling as the fallback wakeup.

use anyhow::Result;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Cursor over an append-only newline-delimited log.
pub struct LogTailer {
    path: PathBuf,
    offset: u64,
    partial: String,
}

impl LogTailer {
    /// Tail from the beginning of the file (backlog + new records).
    pub fn from_start(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            partial: String::new(),
        }
    }

    /// Tail only records appended after this call.
    pub fn from_end(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let offset = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            offset,
            partial: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read any new complete lines since the last poll.
    ///
    /// An absent file or a transient read error yields an empty batch; the
    /// caller just polls again later. Blank lines are dropped.
    pub fn poll_lines(&mut self) -> Vec<String> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let len = match file.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                warn!("Cannot stat {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        // The log is append-only; a shrink means it was replaced. Start over
        // rather than reading from a stale offset.
        if len < self.offset {
            warn!(
                "{} shrank ({} -> {} bytes), resetting cursor",
                self.path.display(),
                self.offset,
                len
            );
            self.offset = 0;
            self.partial.clear();
        }

        if len == self.offset {
            return Vec::new();
        }

        if let Err(e) = file.seek(SeekFrom::Start(self.offset)) {
            warn!("Seek failed on {}: {}", self.path.display(), e);
            return Vec::new();
        }

        let mut chunk = String::new();
        match file.read_to_string(&mut chunk) {
            Ok(read) => self.offset += read as u64,
            Err(e) => {
                warn!("Read failed on {}: {}", self.path.display(), e);
                return Vec::new();
            }
        }

        let buffered = std::mem::take(&mut self.partial) + &chunk;
        let mut lines: Vec<String> = Vec::new();
        let mut rest = buffered.as_str();
        while let Some(pos) = rest.find('\n') {
            let line = &rest[..pos];
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
            rest = &rest[pos + 1..];
        }
        self.partial = rest.to_string();

        lines
    }
}

/// Growth notifications for one file, delivered through a channel.
///
/// Watches the parent directory (the file may not exist yet) and forwards
/// events touching the target path. Dropping the watch stops delivery.
pub struct FileWatch {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<()>,
}

impl FileWatch {
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let file_name = path.file_name().map(|n| n.to_owned()).unwrap_or_default();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()))
                    {
                        let _ = tx.send(());
                    }
                }
                Err(e) => warn!("Watch error: {:?}", e),
            })?;

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        watcher.watch(
            dir.unwrap_or_else(|| Path::new(".")),
            RecursiveMode::NonRecursive,
        )?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for a growth event, bounded by `max`. Returns on either; the
    /// caller re-polls the tailer regardless.
    pub async fn wait(&mut self, max: Duration) {
        let _ = tokio::time::timeout(max, self.rx.recv()).await;
    }
}
