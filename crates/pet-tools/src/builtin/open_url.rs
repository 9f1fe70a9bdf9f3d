//! Open URL tool
//!
//! Validates the URL and emits an open request; the desktop shell performs
//! the actual browser launch when it consumes the result.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{Result, Tool, ToolResult, ToolSchema};

/// Tool that requests a URL be opened in the default browser
pub struct OpenUrlTool;

#[derive(Debug, Deserialize)]
struct OpenUrlArgs {
    url: String,
}

#[async_trait]
impl Tool for OpenUrlTool {
    fn name(&self) -> &str {
        "open_url"
    }

    fn description(&self) -> &str {
        "Open a URL in the user's default browser"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().string("url", "The http(s) URL to open", true)
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: OpenUrlArgs = serde_json::from_value(args)
            .map_err(|e| crate::ToolError::invalid_params(e.to_string()))?;

        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return Ok(ToolResult::error(format!(
                "refusing to open non-http(s) URL: {}",
                args.url
            )));
        }

        Ok(ToolResult::success(serde_json::json!({
            "action": "open_url",
            "url": args.url,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_http_url() {
        let tool = OpenUrlTool;
        let result = tool
            .execute(serde_json::json!({"url": "https://example.com"}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data.unwrap()["url"], "https://example.com");
    }

    #[tokio::test]
    async fn test_rejects_other_schemes() {
        let tool = OpenUrlTool;
        let result = tool
            .execute(serde_json::json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap();

        assert!(!result.success);
    }
}
