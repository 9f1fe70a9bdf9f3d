//! Pet Runtime
//!
//! Drives one model conversation with tool access: per-step streaming,
//! confirmation gating with redacted prompts, a hard step cap, and
//! cooperative abort.

pub mod error;
pub mod event;
pub mod runtime;

pub use error::{Result, RuntimeError};
pub use event::RunEvent;
pub use runtime::{
    AgentRuntime, RunOptions, RunOutcome, ToolCallRecord, DECLINED_MESSAGE, DEFAULT_MAX_STEPS,
};
