//! Model asset error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The download could not be started or the stream broke.
    #[error("download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Non-2xx response from the asset host.
    #[error("download of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The caller cancelled the download.
    #[error("download of '{file_name}' cancelled")]
    Cancelled { file_name: String },

    /// Local filesystem failure.
    #[error("I/O error at {path}: {reason}")]
    Io { path: String, reason: String },

    /// The file on disk is not a usable model file.
    #[error("validation failed for '{file_name}': {reason}")]
    ValidationFailed { file_name: String, reason: String },

    /// The required-model manifest could not be read.
    #[error("manifest error: {reason}")]
    Manifest { reason: String },

    /// Registering the downloaded model into settings failed.
    #[error("failed to register '{file_name}': {reason}")]
    RegistrationFailed { file_name: String, reason: String },
}

impl ModelError {
    pub(crate) fn io(path: &std::path::Path, e: std::io::Error) -> Self {
        ModelError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}
