//! Mock confirmation handler for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{ConfirmOutcome, ConfirmRequest, ConfirmationHandler, Result};

/// Mock behavior modes
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Always approve
    AlwaysApprove,

    /// Always deny
    AlwaysDeny,

    /// Approve the first N requests, then deny
    ApproveNTimes(usize),
}

/// Mock confirmation handler for automated tests
///
/// Records every request it sees so tests can assert on redaction and
/// prompt content.
pub struct MockConfirmation {
    mode: MockMode,
    call_count: AtomicUsize,
    seen: Mutex<Vec<ConfirmRequest>>,
}

impl MockConfirmation {
    /// Create a mock that always approves
    pub fn always_approve() -> Self {
        Self::with_mode(MockMode::AlwaysApprove)
    }

    /// Create a mock that always denies
    pub fn always_deny() -> Self {
        Self::with_mode(MockMode::AlwaysDeny)
    }

    /// Create a mock with a custom mode
    pub fn with_mode(mode: MockMode) -> Self {
        Self {
            mode,
            call_count: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// How many requests this mock has handled
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests seen so far
    pub fn seen_requests(&self) -> Vec<ConfirmRequest> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Shareable handle
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ConfirmationHandler for MockConfirmation {
    async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmOutcome> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let outcome = match &self.mode {
            MockMode::AlwaysApprove => ConfirmOutcome::Approved,
            MockMode::AlwaysDeny => ConfirmOutcome::Denied,
            MockMode::ApproveNTimes(n) => {
                if count < *n {
                    ConfirmOutcome::Approved
                } else {
                    ConfirmOutcome::Denied
                }
            }
        };

        Ok(outcome)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
