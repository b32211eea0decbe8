//! Settings error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the settings file failed.
    #[error("settings I/O error at {path}: {reason}")]
    Io { path: String, reason: String },

    /// The settings file exists but could not be (de)serialized.
    #[error("settings serialization error: {reason}")]
    Serialization { reason: String },

    /// The user-level preference source failed.
    #[error("user settings unavailable: {reason}")]
    UserSettingsUnavailable { reason: String },
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Serialization {
            reason: e.to_string(),
        }
    }
}
