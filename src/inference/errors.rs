//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility. These types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors surfaced by the inference backend and the session pipeline.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The backend could not be reached or refused the connection.
    #[error("backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// Session creation was rejected by the backend.
    #[error("failed to create session: {reason}")]
    SessionCreateFailed { reason: String },

    /// The backend does not know the session handle.
    #[error("session not found: '{session_id}'")]
    SessionNotFound { session_id: String },

    /// Chunk-level failure while the response was streaming.
    #[error("stream error: {reason}")]
    StreamError { reason: String },

    /// Tool catalog could not be loaded.
    #[error("tool load failed for '{source_name}': {reason}")]
    ToolLoadFailed { source_name: String, reason: String },

    /// Model catalog could not be loaded.
    #[error("model load failed: {reason}")]
    ModelLoadFailed { reason: String },

    /// The controller could not reach a ready state before a session call.
    #[error("inference backend is not initialized")]
    NotInitialized,
}

impl InferenceError {
    /// Whether the error came from the backend transport rather than a
    /// request the backend understood and rejected.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            InferenceError::BackendUnavailable { .. } | InferenceError::StreamError { .. }
        )
    }
}
