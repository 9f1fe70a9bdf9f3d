//! Pet Confirm
//!
//! Human confirmation seam for tool execution: the handler trait, request
//! and outcome types, auto/mock strategies, and the redaction pass every
//! confirmation prompt goes through.

pub mod auto;
pub mod error;
pub mod handler;
pub mod mock;
pub mod redact;
pub mod request;

pub use auto::{AutoApprove, AutoDeny};
pub use error::{ConfirmError, Result};
pub use handler::ConfirmationHandler;
pub use mock::{MockConfirmation, MockMode};
pub use redact::{format_arguments, redact_arguments};
pub use request::{ConfirmOutcome, ConfirmRequest};
