//! Current time tool

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::{Result, Tool, ToolResult, ToolSchema};

/// Tool that returns the current date and time
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in ISO 8601 format"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        let now = Utc::now();

        Ok(ToolResult::success(serde_json::json!({
            "timestamp": now.to_rfc3339(),
            "unix": now.timestamp(),
            "formatted": now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        })))
    }
}
