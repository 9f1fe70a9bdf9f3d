//! Error types for confirmation handling

/// Result type for confirmation operations
pub type Result<T> = std::result::Result<T, ConfirmError>;

/// Errors that can occur while requesting confirmation
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    /// The confirmation channel (dialog, console, ...) is unavailable
    #[error("Confirmation channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Serialization error while formatting the prompt
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfirmError {
    /// Create a channel-unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ChannelUnavailable(msg.into())
    }
}
