//! Tool trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, ToolSchema};

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool execution was successful
    pub success: bool,

    /// The result data (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a successful result from serializable data
    pub fn success_data<T: Serialize>(data: T) -> Result<Self> {
        Ok(Self {
            success: true,
            data: Some(serde_json::to_value(data)?),
            error: None,
        })
    }

    /// Create an error result
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Trait for tools that agents and the model can invoke
///
/// Built-in tools and MCP-discovered tools are normalized to this one
/// contract. Identity is the name; MCP tools are namespaced
/// `server_id:tool_name` at registration time.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// Human-readable description, included in the model prompt
    fn description(&self) -> &str;

    /// Parameter schema
    fn schema(&self) -> ToolSchema;

    /// Whether execution must be confirmed by a human first
    ///
    /// The runtime gates confirmed tools behind the configured
    /// confirmation handler; the tool itself stays oblivious.
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// Execute the tool with validated arguments
    async fn execute(&self, args: Value) -> Result<ToolResult>;
}
