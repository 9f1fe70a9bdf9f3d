//! File write tool

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{Result, Tool, ToolResult, ToolSchema};

/// Tool that writes text content to a file
pub struct FileWriteTool;

#[derive(Debug, Deserialize)]
struct FileWriteArgs {
    path: String,
    content: String,
    #[serde(default)]
    append: bool,
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write text content to a file, creating it if needed"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .string("path", "Path of the file to write", true)
            .string("content", "Text content to write", true)
            .boolean("append", "Append instead of overwrite", false)
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: FileWriteArgs = serde_json::from_value(args)
            .map_err(|e| crate::ToolError::invalid_params(e.to_string()))?;

        let result = if args.append {
            use tokio::io::AsyncWriteExt;
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&args.path)
                .await;
            match file {
                Ok(mut f) => f.write_all(args.content.as_bytes()).await,
                Err(e) => Err(e),
            }
        } else {
            tokio::fs::write(&args.path, &args.content).await
        };

        match result {
            Ok(()) => Ok(ToolResult::success(serde_json::json!({
                "path": args.path,
                "bytes": args.content.len(),
            }))),
            Err(e) => Ok(ToolResult::error(format!(
                "failed to write {}: {}",
                args.path, e
            ))),
        }
    }
}
