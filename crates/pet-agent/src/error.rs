//! Error types for agent operations

use pet_core::CoreError;
use pet_tools::ToolError;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur inside an agent
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Execution exceeded the configured timeout
    #[error("Execution timed out after {0}ms")]
    Timeout(u64),

    /// Agent business logic failed
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Initialization hook failed
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Tool error
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error from pet-core
    #[error(transparent)]
    CoreError(#[from] CoreError),
}

impl AgentError {
    /// Create an execution error
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::Execution(msg.into())
    }

    /// Create an initialization error
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        Self::Initialization(msg.into())
    }
}
