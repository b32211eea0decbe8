//! The inference backend contract.
//!
//! The model runtime itself lives outside this crate. Anything that can load
//! tools and models, open sessions and stream responses plugs in here.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::errors::InferenceError;
use super::types::{
    BackendChunk, BackendSessionRequest, CloseReason, ModelCatalog, SendRequest, SessionHandle,
    ToolPack,
};

/// Stream of raw chunks for one turn.
pub type ChunkStream = BoxStream<'static, Result<BackendChunk, InferenceError>>;

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Load the built-in tool catalog.
    async fn load_tools(&self) -> Result<(), InferenceError>;

    /// Load the tools contributed by an externally discovered pack.
    async fn load_tool_pack(&self, pack: &ToolPack) -> Result<(), InferenceError>;

    /// (Re)load the model catalog from the backend settings.
    async fn load_models(&self) -> Result<ModelCatalog, InferenceError>;

    async fn create_session(
        &self,
        request: BackendSessionRequest,
    ) -> Result<SessionHandle, InferenceError>;

    /// Start a turn. The returned stream is pulled by the caller.
    async fn send(&self, request: SendRequest) -> Result<ChunkStream, InferenceError>;

    async fn close_session(
        &self,
        session: &SessionHandle,
        reason: CloseReason,
    ) -> Result<(), InferenceError>;
}
