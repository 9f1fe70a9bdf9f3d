//! Worker nodes
//!
//! Each worker pulls its own pending tasks, drives a nested tool-calling
//! run with a role-specific tool allow-list, and always hands control back
//! to the supervisor.

use pet_model::ChatMessage;
use pet_runtime::{AgentRuntime, RunOptions};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::graph::WorkflowNode;
use crate::message::WorkflowMessage;
use crate::state::{StateUpdate, WorkflowState, WorkflowTaskStatus};
use crate::supervisor::SUPERVISOR;

/// A role-constrained worker backed by a tool-calling runtime
pub struct WorkerNode {
    name: String,
    runtime: Arc<AgentRuntime>,
    enabled_tools: Vec<String>,
    system_prompt: String,
}

impl WorkerNode {
    pub fn new(
        name: &str,
        runtime: Arc<AgentRuntime>,
        enabled_tools: Vec<String>,
        system_prompt: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            runtime,
            enabled_tools,
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Gathers information; no tool access
    pub fn researcher(runtime: Arc<AgentRuntime>) -> Self {
        Self::new(
            "researcher",
            runtime,
            Vec::new(),
            "You are a researcher. Gather the facts the request needs and report them plainly.",
        )
    }

    /// Produces prose from research; no tool access
    pub fn writer(runtime: Arc<AgentRuntime>) -> Self {
        Self::new(
            "writer",
            runtime,
            Vec::new(),
            "You are a writer. Turn the available research into the requested text.",
        )
    }

    /// Performs side effects through the desktop tools
    pub fn executor(runtime: Arc<AgentRuntime>) -> Self {
        Self::new(
            "executor",
            runtime,
            vec![
                "clipboard".to_string(),
                "file_write".to_string(),
                "open_url".to_string(),
            ],
            "You are an executor. Carry out the requested actions with your tools.",
        )
    }

    fn build_prompt(&self, state: &WorkflowState, pending: &[crate::state::WorkflowTask]) -> String {
        let mut prompt = format!("Request: {}\n", state.input);

        if !state.results.is_empty() {
            prompt.push_str("\nResults from other workers:\n");
            for (agent, text) in &state.results {
                prompt.push_str(&format!("## {agent}\n{text}\n"));
            }
        }

        if pending.is_empty() {
            prompt.push_str("\nProvide your contribution to the request.");
        } else {
            prompt.push_str("\nYour tasks:\n");
            for task in pending {
                prompt.push_str(&format!("- {}\n", task.description));
            }
        }
        prompt
    }
}

#[async_trait::async_trait]
impl WorkflowNode for WorkerNode {
    fn id(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let pending = state.pending_tasks_for(&self.name);
        debug!(worker = %self.name, tasks = pending.len(), "worker executing");

        let prompt = self.build_prompt(state, &pending);
        let options = RunOptions::default()
            .with_system_prompt(&self.system_prompt)
            .with_enabled_tools(self.enabled_tools.iter().cloned());
        let outcome = self
            .runtime
            .run(vec![ChatMessage::user(prompt)], options)
            .await?;

        let pending_ids: Vec<&str> = pending.iter().map(|t| t.id.as_str()).collect();
        let mut tasks = state.tasks.clone();
        for task in tasks.iter_mut() {
            if pending_ids.contains(&task.id.as_str()) {
                task.status = WorkflowTaskStatus::Completed;
                task.result = Some(outcome.text.clone());
            }
        }

        let mut results = state.results.clone();
        results.insert(self.name.clone(), outcome.text.clone());

        let mut messages = state.messages.clone();
        messages.push(WorkflowMessage::new(&self.name, SUPERVISOR, &outcome.text));

        Ok(StateUpdate::route_to(SUPERVISOR)
            .with_tasks(tasks)
            .with_results(results)
            .with_messages(messages))
    }
}
