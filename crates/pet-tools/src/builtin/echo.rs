//! Echo tool for testing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, Tool, ToolResult, ToolSchema};

/// Echo tool that returns its input unchanged
///
/// Useful for testing tool calling functionality.
pub struct EchoTool;

#[derive(Debug, Deserialize, Serialize)]
struct EchoArgs {
    text: String,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo back the provided text (useful for testing)"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().string("text", "The text to echo back", true)
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: EchoArgs = serde_json::from_value(args)
            .map_err(|e| crate::ToolError::invalid_params(e.to_string()))?;

        Ok(ToolResult::success(serde_json::json!({
            "echoed": args.text,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo() {
        let echo = EchoTool;
        let result = echo
            .execute(serde_json::json!({"text": "Hello, world!"}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data.unwrap()["echoed"], "Hello, world!");
    }

    #[tokio::test]
    async fn test_echo_missing_text() {
        let echo = EchoTool;
        let result = echo.execute(serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
