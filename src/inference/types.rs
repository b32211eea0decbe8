//! Shared types for talking to the inference backend.
//!
//! Local request types use the domain vocabulary from [`super::protocol`];
//! the `Backend*` types are what actually crosses the backend boundary and
//! carry wire enums.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::protocol::{
    ChatMessageType, ThinkLevel, ToolGroupSelection, WireResponseType, WireThinkLevel,
    WireToolGroup,
};

// ─── Sessions ────────────────────────────────────────────────────────────────

/// Opaque session identifier issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the caller asks for when opening a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Model name; `None` selects the catalog default.
    #[serde(default)]
    pub model: Option<String>,
    pub system_prompt: String,
    pub think_level: ThinkLevel,
    #[serde(default)]
    pub tool_groups: Vec<ToolGroupSelection>,
}

/// Session request in wire vocabulary, as handed to the backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSessionRequest {
    pub model: Option<String>,
    pub system_prompt: String,
    pub think_level: WireThinkLevel,
    pub tool_groups: Vec<WireToolGroup>,
    pub context_size: u32,
}

/// A user turn sent into an open session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub session: SessionHandle,
    pub message: String,
}

/// Why a session is being closed. The backend records this in its own
/// telemetry to tell deliberate closes apart from timeouts and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The caller closed the session explicitly.
    ClosedByCaller,
    /// The caller cancelled an in-flight response stream.
    Cancelled,
}

// ─── Streaming ───────────────────────────────────────────────────────────────

/// Raw chunk as produced by the backend's streaming call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendChunk {
    pub response_type: WireResponseType,
    #[serde(default)]
    pub text: String,
}

impl BackendChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response_type: WireResponseType::Text,
            text: text.into(),
        }
    }
}

/// One item of the response stream handed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A chunk as it arrived, with reasoning markup filtered out of text.
    Delta {
        message_type: ChatMessageType,
        text: String,
    },
    /// Emitted once after the backend stream ends.
    Completed {
        /// Normalized full response text.
        content: String,
        /// Plan extracted from `content`, if the model produced one.
        plan: Option<crate::agent_core::ActionPlan>,
    },
}

// ─── Catalogs ────────────────────────────────────────────────────────────────

/// A model the backend can serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub name: String,
    pub file_name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub is_multi_modal: bool,
}

/// Models loaded by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    #[serde(default)]
    pub default: Option<ModelEntry>,
    #[serde(default)]
    pub local_models: Vec<ModelEntry>,
}

/// An externally discovered bundle of tools, described by its
/// `toolpack.json` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPack {
    pub name: String,
    pub version: String,
    /// Entry point relative to the pack directory, if the pack declares one.
    #[serde(default)]
    pub entry: Option<String>,
    /// Directory the marker was found in. Filled in by discovery.
    #[serde(skip)]
    pub dir: PathBuf,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
