//! Supervisor node
//!
//! Two-phase node under one id: on first execution (no tasks yet) it asks
//! the model to decompose the input into worker tasks; on later executions
//! it reviews accumulated results and decides whether the job is done.
//! Model JSON is treated as unreliable input: parse failures degrade to a
//! safe default instead of failing the run.

use futures::StreamExt;
use pet_model::{ChatMessage, ModelClient, ModelEvent, ModelRequest};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;
use crate::graph::WorkflowNode;
use crate::message::WorkflowMessage;
use crate::state::{StateUpdate, WorkflowState, WorkflowTask};

/// Conventional node id for the supervisor
pub const SUPERVISOR: &str = "supervisor";

/// Worker the decompose fallback assigns to
const FALLBACK_WORKER: &str = "researcher";

#[derive(Debug, Deserialize)]
struct PlannedTask {
    description: String,
    agent: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecomposeReply {
    tasks: Vec<PlannedTask>,
    next_agent: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewReply {
    #[serde(default)]
    is_complete: bool,
    next_agent: String,
    #[serde(default)]
    summary: Option<String>,
}

/// Plans worker tasks and reviews their results
pub struct SupervisorNode {
    model: Arc<dyn ModelClient>,
    workers: Vec<String>,
    end_node: String,
}

impl SupervisorNode {
    pub fn new(model: Arc<dyn ModelClient>, workers: Vec<String>) -> Self {
        Self {
            model,
            workers,
            end_node: "end".to_string(),
        }
    }

    /// Node id the supervisor routes to when the job is complete
    pub fn with_end_node(mut self, end_node: &str) -> Self {
        self.end_node = end_node.to_string();
        self
    }

    async fn decompose(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let prompt = format!(
            "You are the supervisor of a team of workers: {workers}.\n\
             Break the following request into tasks, each assigned to one worker, \
             and pick the worker to start with.\n\
             Respond with strict JSON only: \
             {{\"tasks\":[{{\"description\":\"...\",\"agent\":\"...\"}}],\"nextAgent\":\"...\"}}\n\n\
             Request: {input}",
            workers = self.workers.join(", "),
            input = state.input
        );
        let text = complete_text(&self.model, prompt).await?;

        let (tasks, next) = match serde_json::from_str::<DecomposeReply>(text.trim()) {
            Ok(reply) => {
                let tasks: Vec<WorkflowTask> = reply
                    .tasks
                    .iter()
                    .map(|t| WorkflowTask::new(&t.description, &t.agent))
                    .collect();
                (tasks, reply.next_agent)
            }
            Err(e) => {
                // model broke the contract; fall back to a single research task
                warn!(error = %e, "decompose reply unparseable, using fallback plan");
                (
                    vec![WorkflowTask::new(&state.input, FALLBACK_WORKER)],
                    FALLBACK_WORKER.to_string(),
                )
            }
        };

        debug!(tasks = tasks.len(), next = %next, "plan ready");
        let mut messages = state.messages.clone();
        messages.push(WorkflowMessage::new(
            SUPERVISOR,
            &next,
            &format!("You are up. {} task(s) planned.", tasks.len()),
        ));

        Ok(StateUpdate::route_to(&next)
            .with_tasks(tasks)
            .with_messages(messages))
    }

    async fn review(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let results_block = state
            .results
            .iter()
            .map(|(agent, text)| format!("## {agent}\n{text}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "You are the supervisor. The request was:\n{input}\n\n\
             Results so far:\n{results}\n\n\
             Decide whether the job is complete. Respond with strict JSON only: \
             {{\"isComplete\":true|false,\"nextAgent\":\"<worker>|done\",\"summary\":\"...\"}}",
            input = state.input,
            results = results_block
        );
        let text = complete_text(&self.model, prompt).await?;

        match serde_json::from_str::<ReviewReply>(text.trim()) {
            Ok(reply) if reply.is_complete || reply.next_agent == "done" => {
                let output = reply.summary.unwrap_or_else(|| results_block.clone());
                Ok(StateUpdate::route_to(&self.end_node).with_output(&output))
            }
            Ok(reply) => {
                let mut messages = state.messages.clone();
                messages.push(WorkflowMessage::new(
                    SUPERVISOR,
                    &reply.next_agent,
                    "Keep going.",
                ));
                Ok(StateUpdate::route_to(&reply.next_agent).with_messages(messages))
            }
            Err(e) => {
                // do not loop forever on a broken contract; finish with what we have
                warn!(error = %e, "review reply unparseable, completing with partial results");
                Ok(StateUpdate::route_to(&self.end_node).with_output(&results_block))
            }
        }
    }
}

#[async_trait::async_trait]
impl WorkflowNode for SupervisorNode {
    fn id(&self) -> &str {
        SUPERVISOR
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate> {
        if state.tasks.is_empty() {
            self.decompose(state).await
        } else {
            self.review(state).await
        }
    }
}

/// Run one non-streaming completion and collect the full text
async fn complete_text(model: &Arc<dyn ModelClient>, prompt: String) -> Result<String> {
    let request = ModelRequest::new(vec![ChatMessage::user(prompt)]);
    let mut stream = model
        .stream_step(request, CancellationToken::new())
        .await?;

    let mut text = String::new();
    while let Some(event) = stream.next().await {
        match event? {
            ModelEvent::TextChunk(chunk) => text.push_str(&chunk),
            ModelEvent::ToolCall(_) => {}
        }
    }
    Ok(text)
}
