//! Confirmation handler trait

use async_trait::async_trait;

use crate::{ConfirmOutcome, ConfirmRequest, Result};

/// Trait for confirmation handlers
///
/// Implementations decide how a [`ConfirmRequest`] reaches a human: a
/// desktop dialog, a console prompt, or a test double. Handlers may
/// suspend for as long as the user takes; the runtime deliberately places
/// no timeout around this call.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// Ask for confirmation of a tool execution
    async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmOutcome>;

    /// Handler name (for logging)
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestHandler;

    #[async_trait]
    impl ConfirmationHandler for TestHandler {
        async fn confirm(&self, _request: ConfirmRequest) -> Result<ConfirmOutcome> {
            Ok(ConfirmOutcome::Approved)
        }

        fn name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_handler_trait() {
        let handler = TestHandler;
        assert_eq!(handler.name(), "test");

        let req = ConfirmRequest::new("echo", "Run echo?");
        let outcome = handler.confirm(req).await.unwrap();
        assert!(outcome.is_approved());
    }
}
