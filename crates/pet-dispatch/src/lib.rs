//! Trigger management and agent dispatch
//!
//! [`TriggerManager`] arms schedule, event, and condition triggers and
//! scores user-message triggers on demand. [`AgentDispatcher`] owns the
//! registered agents, turns trigger fires into queued tasks, and drains
//! the queue under a concurrency cap with bounded retries.

pub mod dispatcher;
pub mod error;
pub mod history;
pub mod task;
pub mod taskdef;
pub mod trigger;

pub use dispatcher::{AgentDispatcher, AgentStatus, DispatcherState, DispatcherStats};
pub use error::{DispatchError, Result};
pub use history::{ExecutionHistory, ExecutionRecord};
pub use task::{AgentTask, TaskStatus};
pub use taskdef::{compute_next_run, ActionConfig, TaskDefinition, TriggerConfig};
pub use trigger::{
    parse_cron, ConditionEvaluator, TriggerCallback, TriggerFire, TriggerManager, TriggerMatch,
};
