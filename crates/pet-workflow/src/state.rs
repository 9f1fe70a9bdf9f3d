//! Workflow run state
//!
//! One mutable [`WorkflowState`] is threaded through a run. Nodes never
//! mutate it directly; they return a [`StateUpdate`] the executor merges
//! field by field. A field set in the update replaces the state's value
//! wholesale, so nodes extending a collection must copy it forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::message::WorkflowMessage;

/// Lifecycle of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
    Error,
}

/// Status of one workflow-scoped task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowTaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// A unit of work the supervisor hands to a worker
///
/// Distinct from dispatcher tasks: these live only inside one run's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTask {
    pub id: String,
    pub description: String,

    /// Worker node name this task belongs to
    pub assigned_to: String,

    pub status: WorkflowTaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl WorkflowTask {
    pub fn new(description: &str, assigned_to: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.to_string(),
            assigned_to: assigned_to.to_string(),
            status: WorkflowTaskStatus::Pending,
            result: None,
        }
    }
}

/// The canonical record of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// The user request the run is working on
    pub input: String,

    /// Node to execute next; `None` ends the loop
    pub current_node: Option<String>,

    pub iteration: usize,
    pub max_iterations: usize,
    pub status: WorkflowStatus,

    pub tasks: Vec<WorkflowTask>,

    /// Latest output per worker name
    pub results: HashMap<String, String>,

    pub messages: Vec<WorkflowMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(input: &str, max_iterations: usize) -> Self {
        Self {
            input: input.to_string(),
            current_node: None,
            iteration: 0,
            max_iterations,
            status: WorkflowStatus::Idle,
            tasks: Vec::new(),
            results: HashMap::new(),
            messages: Vec::new(),
            output: None,
            error: None,
            started_at: None,
            ended_at: None,
        }
    }

    /// Merge a node's partial update into this state
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(current_node) = update.current_node {
            self.current_node = Some(current_node);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(tasks) = update.tasks {
            self.tasks = tasks;
        }
        if let Some(results) = update.results {
            self.results = results;
        }
        if let Some(messages) = update.messages {
            self.messages = messages;
        }
        if let Some(output) = update.output {
            self.output = Some(output);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
    }

    /// Pending tasks assigned to one worker
    pub fn pending_tasks_for(&self, worker: &str) -> Vec<WorkflowTask> {
        self.tasks
            .iter()
            .filter(|t| t.assigned_to == worker && t.status == WorkflowTaskStatus::Pending)
            .cloned()
            .collect()
    }
}

/// Partial state returned by a node; unset fields leave state untouched
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub current_node: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub tasks: Option<Vec<WorkflowTask>>,
    pub results: Option<HashMap<String, String>>,
    pub messages: Option<Vec<WorkflowMessage>>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl StateUpdate {
    pub fn route_to(node: &str) -> Self {
        Self {
            current_node: Some(node.to_string()),
            ..Default::default()
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<WorkflowTask>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn with_results(mut self, results: HashMap<String, String>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_messages(mut self, messages: Vec<WorkflowMessage>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn with_output(mut self, output: &str) -> Self {
        self.output = Some(output.to_string());
        self
    }
}
