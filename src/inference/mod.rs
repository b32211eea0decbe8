//! Inference plumbing between callers and the external model backend.
//!
//! - [`protocol`]: local enums and their total mappings to wire codes
//! - [`normalizer`]: cleanup of raw model text, streamed and whole
//! - [`backend`]: the backend contract the runtime drives
//! - [`streaming`]: the cancellable, caller-facing response stream
//!
//! The backend is swappable; nothing here assumes a particular runtime.

pub mod backend;
pub mod errors;
pub mod normalizer;
pub mod protocol;
pub mod streaming;
pub mod types;

pub use backend::{ChunkStream, InferenceBackend};
pub use errors::InferenceError;
pub use normalizer::{clean_content, ThinkFilter};
pub use protocol::{
    message_type_from_wire, think_level_from_wire, think_level_to_wire, tool_group_to_wire,
    ChatMessageType, ThinkLevel, ToolGroupSelection, WireResponseType, WireThinkLevel,
    WireToolGroup,
};
pub use streaming::{response_stream, ResponseStream};
pub use types::{
    BackendChunk, BackendSessionRequest, CloseReason, ModelCatalog, ModelEntry, SendRequest,
    SessionEvent, SessionHandle, SessionRequest, ToolPack,
};
