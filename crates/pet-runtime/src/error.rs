//! Error types for the runtime loop

use pet_confirm::ConfirmError;
use pet_model::ModelError;
use pet_tools::ToolError;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while driving a model conversation
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Model client error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Tool error that could not be expressed in-band
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Confirmation channel error
    #[error("Confirmation error: {0}")]
    Confirm(#[from] ConfirmError),

    /// Step cap reached without a final answer
    #[error("Max steps exceeded: {0}")]
    MaxStepsExceeded(usize),

    /// The run was aborted
    #[error("Run aborted")]
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_steps_display() {
        let err = RuntimeError::MaxStepsExceeded(5);
        assert!(err.to_string().contains('5'));
    }
}
