//! Scripted mock model for tests
//!
//! Each call to `stream_step` pops the next scripted step and replays its
//! text (in chunks) and tool calls. When the script runs out, an empty
//! final step is produced so runtime loops terminate.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{ModelClient, ModelError, ModelEvent, ModelRequest, ModelStream, Result, ToolCall};

/// One scripted reasoning step
#[derive(Debug, Clone, Default)]
pub struct ScriptedStep {
    /// Text to stream
    pub text: String,

    /// Tool calls to request after the text
    pub tool_calls: Vec<ToolCall>,
}

impl ScriptedStep {
    /// A step that only streams text
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A step that requests a single tool call
    pub fn tool_call<S: Into<String>>(name: S, arguments: serde_json::Value) -> Self {
        Self {
            text: String::new(),
            tool_calls: vec![ToolCall {
                id: uuid_like(),
                name: name.into(),
                arguments,
            }],
        }
    }

    /// Add streamed text to the step
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }
}

fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    format!("call_{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

/// Scripted model client
pub struct MockModel {
    script: Mutex<VecDeque<ScriptedStep>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl MockModel {
    /// Create a mock replaying the given steps in order
    pub fn with_script(steps: Vec<ScriptedStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock that answers every step with the same text
    pub fn always_text<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        Self::with_script(vec![ScriptedStep::text(text)])
    }

    /// Requests the mock has received, for assertions
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn stream_step(
        &self,
        request: ModelRequest,
        cancel: CancellationToken,
    ) -> Result<ModelStream> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let step = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default();

        let stream = async_stream::stream! {
            // stream text in small chunks to exercise accumulation
            for chunk in step.text.as_bytes().chunks(16) {
                if cancel.is_cancelled() {
                    yield Err(ModelError::Aborted);
                    return;
                }
                yield Ok(ModelEvent::TextChunk(
                    String::from_utf8_lossy(chunk).into_owned(),
                ));
            }

            for call in step.tool_calls {
                if cancel.is_cancelled() {
                    yield Err(ModelError::Aborted);
                    return;
                }
                yield Ok(ModelEvent::ToolCall(call));
            }
        };

        Ok(Box::pin(stream))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
