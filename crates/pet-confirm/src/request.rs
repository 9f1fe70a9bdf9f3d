//! Confirmation request and outcome types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request for a human decision before a tool runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
    /// Unique identifier for tracking
    pub id: String,

    /// Name of the tool awaiting confirmation
    pub tool_name: String,

    /// Rendered, already-redacted argument summary shown to the user
    pub prompt: String,

    /// Raw (redacted) arguments for UIs that render their own view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,

    /// When the request was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConfirmRequest {
    /// Create a new confirmation request
    pub fn new<S: Into<String>>(tool_name: S, prompt: S) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            prompt: prompt.into(),
            arguments: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Attach the redacted arguments
    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

/// Outcome of a confirmation request
///
/// Closing the dialog counts as a denial; there is no third state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmOutcome {
    /// Proceed with the tool call
    Approved,
    /// Do not run the tool
    Denied,
}

impl ConfirmOutcome {
    /// Whether the request was approved
    pub fn is_approved(&self) -> bool {
        matches!(self, ConfirmOutcome::Approved)
    }
}
