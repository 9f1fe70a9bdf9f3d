//! Clipboard tool
//!
//! The desktop shell owns the real clipboard; this tool keeps the last
//! written value in process so agents can read back what they copied even
//! when no shell is attached (tests, headless runs).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;

use crate::{Result, Tool, ToolResult, ToolSchema};

/// Clipboard read/write tool
#[derive(Default)]
pub struct ClipboardTool {
    last_written: Mutex<Option<String>>,
}

impl ClipboardTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Deserialize)]
struct ClipboardArgs {
    action: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Tool for ClipboardTool {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn description(&self) -> &str {
        "Read from or write text to the clipboard"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .string_enum(
                "action",
                "Whether to read or write",
                vec!["read".to_string(), "write".to_string()],
                true,
            )
            .string("text", "Text to write (write action only)", false)
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: ClipboardArgs = serde_json::from_value(args)
            .map_err(|e| crate::ToolError::invalid_params(e.to_string()))?;

        match args.action.as_str() {
            "write" => {
                let text = args
                    .text
                    .ok_or_else(|| crate::ToolError::invalid_params("'text' required for write"))?;
                *self.last_written.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.clone());
                Ok(ToolResult::success(serde_json::json!({"written": text})))
            }
            "read" => {
                let text = self
                    .last_written
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                Ok(ToolResult::success(serde_json::json!({"text": text})))
            }
            other => Ok(ToolResult::error(format!(
                "unknown clipboard action: {}",
                other
            ))),
        }
    }
}
