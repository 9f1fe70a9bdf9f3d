//! Tool registry for managing and executing tools
//!
//! Thread-safe; can be cloned and shared across async tasks. MCP-discovered
//! tools are registered through [`ToolRegistry::register_mcp`], which
//! namespaces them as `server_id:tool_name` so servers cannot collide with
//! built-ins or each other.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::{error::ToolError, tool::Tool, Result, ToolResult, ToolSchema};

/// Build the namespaced registry name for an MCP-discovered tool
pub fn mcp_tool_name(server_id: &str, tool_name: &str) -> String {
    format!("{}:{}", server_id, tool_name)
}

/// Wrapper giving an MCP-discovered tool its namespaced identity
struct NamespacedTool {
    name: String,
    inner: Arc<dyn Tool>,
}

#[async_trait]
impl Tool for NamespacedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn schema(&self) -> ToolSchema {
        self.inner.schema()
    }

    fn requires_confirmation(&self) -> bool {
        self.inner.requires_confirmation()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        self.inner.execute(args).await
    }
}

/// Registry for managing tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    /// Map of tool name to tool implementation
    tools: Arc<DashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self {
            tools: Arc::new(DashMap::new()),
        }
    }

    /// Register a tool
    ///
    /// Errors if a tool with the same name is already registered.
    pub fn register<T: Tool + 'static>(&self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register an already-shared tool
    pub fn register_arc(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();

        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }

        self.tools.insert(name.clone(), tool);
        tracing::debug!("Registered tool: {}", name);
        Ok(())
    }

    /// Register a tool, replacing any existing one with the same name
    pub fn register_or_replace<T: Tool + 'static>(&self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name.clone(), Arc::new(tool));
        tracing::debug!("Registered/replaced tool: {}", name);
    }

    /// Register an MCP-discovered tool under its `server_id:tool_name`
    pub fn register_mcp(&self, server_id: &str, tool: Arc<dyn Tool>) -> Result<()> {
        let name = mcp_tool_name(server_id, tool.name());
        self.register_arc(Arc::new(NamespacedTool { name, inner: tool }))
    }

    /// Check if a tool is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Execute a tool by name
    ///
    /// Arguments are validated against the tool's schema before the
    /// handler runs.
    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolResult> {
        let tool = self.get_tool(name).ok_or_else(|| ToolError::not_found(name))?;

        tool.schema().validate(&args)?;

        tracing::info!("Executing tool: {} with args: {}", name, args);

        match tool.execute(args).await {
            Ok(result) => {
                tracing::debug!("Tool {} executed successfully", name);
                Ok(result)
            }
            Err(e) => {
                tracing::error!("Tool {} execution failed: {}", name, e);
                Err(e)
            }
        }
    }

    /// List all registered tool names
    pub fn list_tools(&self) -> Vec<String> {
        self.tools.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered tools
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Render every tool in the model client's format
    pub fn to_model_tools(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|entry| {
                let tool = entry.value();
                tool.schema().to_model_tool(tool.name(), tool.description())
            })
            .collect()
    }

    /// Remove all registered tools
    pub fn clear(&self) {
        let count = self.tools.len();
        self.tools.clear();
        tracing::info!("Cleared {} tools from registry", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MockTool;

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            "mock_tool"
        }

        fn description(&self) -> &str {
            "A mock tool for testing"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new()
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult> {
            Ok(ToolResult::success(serde_json::json!({"result": "mocked"})))
        }
    }

    #[test]
    fn test_register_tool() {
        let registry = ToolRegistry::new();
        registry.register(MockTool).unwrap();

        assert_eq!(registry.count(), 1);
        assert!(registry.has_tool("mock_tool"));
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = ToolRegistry::new();

        registry.register(MockTool).unwrap();
        let result = registry.register(MockTool);

        assert!(matches!(
            result.unwrap_err(),
            ToolError::AlreadyRegistered(_)
        ));
    }

    #[test]
    fn test_register_or_replace() {
        let registry = ToolRegistry::new();

        registry.register_or_replace(MockTool);
        registry.register_or_replace(MockTool);

        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_mcp_namespacing() {
        let registry = ToolRegistry::new();
        registry
            .register_mcp("bookmarks", Arc::new(MockTool))
            .unwrap();

        assert!(registry.has_tool("bookmarks:mock_tool"));
        assert!(!registry.has_tool("mock_tool"));

        // same tool from a different server does not collide
        registry.register_mcp("notes", Arc::new(MockTool)).unwrap();
        assert_eq!(registry.count(), 2);
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let registry = ToolRegistry::new();
        registry.register(MockTool).unwrap();

        let result = registry
            .execute("mock_tool", serde_json::json!({}))
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_execute_nonexistent_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nonexistent", serde_json::json!({})).await;

        assert!(matches!(result.unwrap_err(), ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_execute_validates_args() {
        struct StrictTool;

        #[async_trait]
        impl Tool for StrictTool {
            fn name(&self) -> &str {
                "strict"
            }
            fn description(&self) -> &str {
                "Requires a url"
            }
            fn schema(&self) -> ToolSchema {
                ToolSchema::new().string("url", "URL", true)
            }
            async fn execute(&self, _args: Value) -> Result<ToolResult> {
                Ok(ToolResult::success(serde_json::json!(null)))
            }
        }

        let registry = ToolRegistry::new();
        registry.register(StrictTool).unwrap();

        let result = registry.execute("strict", serde_json::json!({})).await;
        assert!(matches!(
            result.unwrap_err(),
            ToolError::InvalidParameters(_)
        ));
    }

    #[test]
    fn test_model_tools_rendering() {
        let registry = ToolRegistry::new();
        registry.register(MockTool).unwrap();

        let tools = registry.to_model_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "mock_tool");
        assert_eq!(tools[0]["parameters"]["type"], "object");
    }

    #[test]
    fn test_clear() {
        let registry = ToolRegistry::new();
        registry.register(MockTool).unwrap();
        registry.clear();
        assert_eq!(registry.count(), 0);
    }
}
