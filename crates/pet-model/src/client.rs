//! Model client trait

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::{ModelRequest, Result, ToolCall};

/// Events emitted by the model during one reasoning step
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// A chunk of streamed text
    TextChunk(String),

    /// The model requests a tool invocation
    ToolCall(ToolCall),
}

/// Type alias for the per-step event stream
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelEvent>> + Send>>;

/// Trait for model completion clients
///
/// The agent core consumes the model as a black box: messages and tool
/// schemas go in, a stream of text chunks and tool calls comes out, one
/// stream per reasoning step. Implementations must stop promptly when the
/// supplied token is cancelled.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one reasoning step, streaming its events
    ///
    /// The stream ends when the step is complete. Tool calls arriving in
    /// the stream are to be executed by the caller, who then issues the
    /// next step with the results appended to `messages`.
    async fn stream_step(
        &self,
        request: ModelRequest,
        cancel: CancellationToken,
    ) -> Result<ModelStream>;

    /// Model identifier (for logging)
    fn model(&self) -> &str;
}
