//! Queued task representation

use chrono::{DateTime, Utc};
use pet_agent::{AgentContext, AgentPriority, AgentResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a queued task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// One unit of work waiting for, or undergoing, execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Task id
    pub id: String,

    /// Target agent
    pub agent_id: String,

    /// Priority copied from the agent's metadata at enqueue time
    pub priority: AgentPriority,

    /// Context the agent will execute with
    pub context: AgentContext,

    /// When the task was enqueued
    pub created_at: DateTime<Utc>,

    /// Current lifecycle state
    pub status: TaskStatus,

    /// When execution began
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    /// When execution settled
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Result of the last attempt
    #[serde(default)]
    pub result: Option<AgentResult>,

    /// Number of retry attempts so far
    #[serde(default)]
    pub retry_count: u32,
}

impl AgentTask {
    /// Create a pending task for an agent
    pub fn new(agent_id: &str, priority: AgentPriority, context: AgentContext) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            priority,
            context,
            created_at: Utc::now(),
            status: TaskStatus::Pending,
            started_at: None,
            completed_at: None,
            result: None,
            retry_count: 0,
        }
    }

    /// Reset the task for another attempt
    pub fn reset_for_retry(&mut self) {
        self.status = TaskStatus::Pending;
        self.started_at = None;
        self.completed_at = None;
        self.retry_count += 1;
    }
}
