//! Error types for model clients

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while talking to a model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The request was aborted via its cancellation token
    #[error("Model request aborted")]
    Aborted,

    /// The provider returned an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Failed to parse the provider's output
    #[error("Response parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    /// Create a provider error
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }
}
