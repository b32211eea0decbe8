//! Local agent runtime: brings a local inference backend up, keeps its model
//! folder and host registration in order, and fronts session traffic.

pub mod agent_core;
pub mod host;
pub mod inference;
pub mod lifecycle;
pub mod models;
pub mod settings;

#[cfg(test)]
mod test_support;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Per-user directory for the runtime's logs and traces: the platform data
/// directory (for example `$XDG_DATA_HOME` on Linux or
/// `~/Library/Application Support` on macOS) plus `local-agent-runtime`.
/// Without one, `.local-agent-runtime` in the home directory is used.
pub fn data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(base) => base.join(APP_DIR_NAME),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!(".{APP_DIR_NAME}")),
    }
}

const APP_DIR_NAME: &str = "local-agent-runtime";

pub const LOG_FILE_NAME: &str = "runtime.log";

const ROTATED_LOGS_KEPT: u32 = 3;

/// Install the global tracing subscriber, writing to `<log_dir>/runtime.log`.
///
/// Existing logs are rotated first (`runtime.log` → `.1` → `.2` → `.3`).
/// The filter comes from `RUST_LOG`, defaulting to
/// `local_agent_runtime=info,warn`. Call once, at process start.
pub fn init_tracing(log_dir: &Path) -> io::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    rotate_logs(&log_path, ROTATED_LOGS_KEPT);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("local_agent_runtime=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(SyncedLogFile::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| io::Error::other(format!("tracing already initialized: {e}")))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== local agent runtime starting ==="
    );
    Ok(())
}

fn rotated_path(base: &Path, generation: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

/// Shift `base` into `base.1`, `base.1` into `base.2`, and so on up to
/// `base.{keep}`. Whatever was in `base.{keep}` is overwritten.
fn rotate_logs(base: &Path, keep: u32) {
    for generation in (0..keep).rev() {
        let from = match generation {
            0 => base.to_path_buf(),
            n => rotated_path(base, n),
        };
        if from.exists() {
            if let Err(e) = std::fs::rename(&from, rotated_path(base, generation + 1)) {
                eprintln!("log rotation failed for {}: {e}", from.display());
            }
        }
    }
}

/// Shared log file handle; every write is flushed before returning so a
/// crash loses at most the line being written.
#[derive(Clone)]
struct SyncedLogFile(Arc<Mutex<File>>);

impl SyncedLogFile {
    fn new(file: File) -> Self {
        Self(Arc::new(Mutex::new(file)))
    }

    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut file)
    }
}

impl Write for SyncedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|f| {
            f.write_all(buf)?;
            f.flush()?;
            Ok(buf.len())
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|f| f.flush())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SyncedLogFile {
    type Writer = SyncedLogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
