//! Plain-text lifecycle trace.
//!
//! A coarse, human-readable record of initialization and session events,
//! separate from the structured log. Writes are best-effort.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

pub const TRACE_FILE_NAME: &str = "lifecycle-trace.log";

#[derive(Debug, Clone)]
pub struct TraceLog {
    path: Option<PathBuf>,
}

impl TraceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Trace file inside the given data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TRACE_FILE_NAME))
    }

    /// A trace that writes nothing.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append `"<rfc3339> <message>"`. Failures are ignored.
    pub fn record(&self, message: impl AsRef<str>) {
        let Some(path) = &self.path else { return };
        let line = format!(
            "{} {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message.as_ref()
        );
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}
