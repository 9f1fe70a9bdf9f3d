//! Events emitted during a runtime run

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events surfaced to the caller as a run progresses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Text content chunk from the model
    TextChunk {
        /// The text content
        content: String,
    },

    /// The model is requesting a tool
    ToolCallStart {
        /// Tool being called
        tool_name: String,
        /// Tool arguments
        arguments: Value,
    },

    /// Tool execution completed
    ToolCallEnd {
        /// Tool that was called
        tool_name: String,
        /// Whether execution was successful
        success: bool,
        /// Result data (if successful)
        result: Option<Value>,
        /// Error message (if failed)
        error: Option<String>,
    },

    /// Final response is complete
    Done {
        /// Number of reasoning steps taken
        steps: usize,
    },

    /// An error occurred
    Error {
        /// Error message
        message: String,
    },
}

impl RunEvent {
    /// Create a text chunk event
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self::TextChunk {
            content: content.into(),
        }
    }

    /// Create a tool call start event
    pub fn tool_call_start<S: Into<String>>(tool_name: S, arguments: Value) -> Self {
        Self::ToolCallStart {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Create a tool call end event
    pub fn tool_call_end<S: Into<String>>(
        tool_name: S,
        success: bool,
        result: Option<Value>,
        error: Option<String>,
    ) -> Self {
        Self::ToolCallEnd {
            tool_name: tool_name.into(),
            success,
            result,
            error,
        }
    }

    /// Create a done event
    pub fn done(steps: usize) -> Self {
        Self::Done { steps }
    }

    /// Create an error event
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = RunEvent::tool_call_start("echo", serde_json::json!({"text": "hi"}));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("tool_call_start"));

        let back: RunEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, RunEvent::ToolCallStart { .. }));
    }
}
