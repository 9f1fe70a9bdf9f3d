//! Chat message and request types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a tool-result message
    pub fn tool<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// Request for one reasoning step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Conversation so far
    pub messages: Vec<ChatMessage>,

    /// Tool descriptions in the model format
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,

    /// Optional system prompt, prepended by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Output token cap
    pub max_output_tokens: u32,
}

impl ModelRequest {
    /// Create a request with defaults matching the companion app
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            system_prompt: None,
            temperature: 0.7,
            max_output_tokens: 2048,
        }
    }

    /// Attach tool descriptions
    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id assigned by the model
    pub id: String,

    /// Tool name
    pub name: String,

    /// Parsed JSON arguments
    pub arguments: Value,
}
