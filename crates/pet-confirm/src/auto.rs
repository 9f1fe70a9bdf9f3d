//! Auto-responding confirmation handlers

use async_trait::async_trait;

use crate::{ConfirmOutcome, ConfirmRequest, ConfirmationHandler, Result};

/// Handler that approves everything
///
/// For headless runs and trusted tool sets only.
pub struct AutoApprove;

#[async_trait]
impl ConfirmationHandler for AutoApprove {
    async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmOutcome> {
        tracing::debug!("Auto-approving tool: {}", request.tool_name);
        Ok(ConfirmOutcome::Approved)
    }

    fn name(&self) -> &str {
        "auto_approve"
    }
}

/// Handler that denies everything
///
/// Useful as a safe default when no UI is attached.
pub struct AutoDeny;

#[async_trait]
impl ConfirmationHandler for AutoDeny {
    async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmOutcome> {
        tracing::warn!("Auto-denying tool: {}", request.tool_name);
        Ok(ConfirmOutcome::Denied)
    }

    fn name(&self) -> &str {
        "auto_deny"
    }
}
