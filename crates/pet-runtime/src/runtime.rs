//! Agent runtime: the model ⇄ tool loop
//!
//! Drives one conversation with tool access. Each step streams model
//! output; requested tools are executed (behind confirmation where the
//! tool demands it) and their results fed back, until the model answers
//! without tool calls or the step cap is hit.

use futures::StreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pet_confirm::{format_arguments, redact_arguments, ConfirmRequest, ConfirmationHandler};
use pet_model::{ChatMessage, ModelClient, ModelEvent, ModelRequest, ToolCall};
use pet_tools::{ToolRegistry, ToolResult};

use crate::{error::RuntimeError, event::RunEvent, Result};

/// Message shown in place of a result when the user declines a tool
pub const DECLINED_MESSAGE: &str = "用户拒绝执行该工具";

/// Default cap on model ⇄ tool round trips per run
pub const DEFAULT_MAX_STEPS: usize = 5;

/// Options for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Allow-list of tool names; `None` exposes every registered tool
    pub enabled_tools: Option<Vec<String>>,

    /// Cap on reasoning steps
    pub max_steps: usize,

    /// Optional system prompt
    pub system_prompt: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            enabled_tools: None,
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: None,
        }
    }
}

impl RunOptions {
    /// Restrict the run to the named tools
    pub fn with_enabled_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Set the step cap
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Record of one executed tool call
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Tool name
    pub name: String,

    /// Arguments the model supplied
    pub arguments: Value,

    /// Execution result (including in-band failures)
    pub result: ToolResult,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Accumulated final text
    pub text: String,

    /// Every tool call made during the run
    pub tool_calls: Vec<ToolCallRecord>,

    /// Reasoning steps taken
    pub steps: usize,
}

/// The tool-calling runtime
pub struct AgentRuntime {
    model: Arc<dyn ModelClient>,
    tools: ToolRegistry,
    confirm: Arc<dyn ConfirmationHandler>,
    current: Mutex<Option<CancellationToken>>,
}

impl AgentRuntime {
    /// Create a runtime over a model, tool registry, and confirmation handler
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: ToolRegistry,
        confirm: Arc<dyn ConfirmationHandler>,
    ) -> Self {
        Self {
            model,
            tools,
            confirm,
            current: Mutex::new(None),
        }
    }

    /// Whether a run is currently in flight
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Abort the in-flight run, if any
    ///
    /// Cancellation is cooperative: it takes effect at the next stream
    /// poll or loop check.
    pub fn abort(&self) {
        if let Some(token) = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            tracing::info!("Aborting in-flight run");
            token.cancel();
        }
    }

    /// Run the loop to completion without observing events
    pub async fn run(&self, messages: Vec<ChatMessage>, options: RunOptions) -> Result<RunOutcome> {
        self.run_with_events(messages, options, None).await
    }

    /// Run the loop, emitting [`RunEvent`]s into the supplied channel
    pub async fn run_with_events(
        &self,
        messages: Vec<ChatMessage>,
        options: RunOptions,
        events: Option<mpsc::UnboundedSender<RunEvent>>,
    ) -> Result<RunOutcome> {
        let cancel = CancellationToken::new();
        {
            let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
            *slot = Some(cancel.clone());
        }

        let result = self
            .run_inner(messages, options, events.as_ref(), &cancel)
            .await;

        {
            let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
            *slot = None;
        }

        if let (Err(e), Some(tx)) = (&result, events.as_ref()) {
            let _ = tx.send(RunEvent::error(e.to_string()));
        }

        result
    }

    async fn run_inner(
        &self,
        mut conversation: Vec<ChatMessage>,
        options: RunOptions,
        events: Option<&mpsc::UnboundedSender<RunEvent>>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let model_tools = self.active_model_tools(options.enabled_tools.as_deref());
        let mut records: Vec<ToolCallRecord> = Vec::new();

        let emit = |event: RunEvent| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };

        for step in 1..=options.max_steps {
            if cancel.is_cancelled() {
                return Err(RuntimeError::Aborted);
            }

            tracing::debug!("Runtime step {}/{}", step, options.max_steps);

            let mut request =
                ModelRequest::new(conversation.clone()).with_tools(model_tools.clone());
            if let Some(prompt) = &options.system_prompt {
                request = request.with_system_prompt(prompt.clone());
            }

            let mut stream = self
                .model
                .stream_step(request, cancel.child_token())
                .await?;

            let mut step_text = String::new();
            let mut step_calls: Vec<ToolCall> = Vec::new();

            while let Some(event) = stream.next().await {
                match event? {
                    ModelEvent::TextChunk(chunk) => {
                        step_text.push_str(&chunk);
                        emit(RunEvent::text(chunk));
                    }
                    ModelEvent::ToolCall(call) => step_calls.push(call),
                }
            }

            if step_calls.is_empty() {
                // no tool calls: the response is final
                emit(RunEvent::done(step));
                return Ok(RunOutcome {
                    text: step_text,
                    tool_calls: records,
                    steps: step,
                });
            }

            if !step_text.is_empty() {
                conversation.push(ChatMessage::assistant(&step_text));
            }

            for call in step_calls {
                emit(RunEvent::tool_call_start(
                    call.name.clone(),
                    redact_arguments(&call.arguments),
                ));

                let result = self
                    .execute_gated(&call, options.enabled_tools.as_deref())
                    .await;

                emit(RunEvent::tool_call_end(
                    call.name.clone(),
                    result.success,
                    result.data.clone(),
                    result.error.clone(),
                ));

                let result_text = if result.success {
                    format!(
                        "Tool '{}' returned: {}",
                        call.name,
                        result
                            .data
                            .as_ref()
                            .map(|d| d.to_string())
                            .unwrap_or_default()
                    )
                } else {
                    format!(
                        "Tool '{}' failed: {}",
                        call.name,
                        result.error.as_deref().unwrap_or("Unknown error")
                    )
                };
                conversation.push(ChatMessage::tool(result_text));

                records.push(ToolCallRecord {
                    name: call.name,
                    arguments: call.arguments,
                    result,
                });
            }
        }

        tracing::error!("Max steps ({}) exceeded", options.max_steps);
        Err(RuntimeError::MaxStepsExceeded(options.max_steps))
    }

    /// Render the active tool subset in the model format
    fn active_model_tools(&self, enabled: Option<&[String]>) -> Vec<Value> {
        match enabled {
            None => self.tools.to_model_tools(),
            Some(names) => names
                .iter()
                .filter_map(|name| self.tools.get_tool(name))
                .map(|tool| tool.schema().to_model_tool(tool.name(), tool.description()))
                .collect(),
        }
    }

    /// Execute one tool call with confirmation gating
    ///
    /// Every failure mode comes back as an in-band [`ToolResult`] so the
    /// model can react in-conversation instead of the run aborting.
    async fn execute_gated(&self, call: &ToolCall, enabled: Option<&[String]>) -> ToolResult {
        if let Some(names) = enabled {
            if !names.iter().any(|n| n == &call.name) {
                return ToolResult::error(format!("Tool '{}' is not enabled", call.name));
            }
        }

        let tool = match self.tools.get_tool(&call.name) {
            Some(tool) => tool,
            None => return ToolResult::error(format!("Tool not found: {}", call.name)),
        };

        if tool.requires_confirmation() {
            let prompt = format!(
                "即将执行工具 {}，参数：\n{}",
                call.name,
                format_arguments(&call.arguments)
            );
            let request = ConfirmRequest::new(call.name.clone(), prompt)
                .with_arguments(redact_arguments(&call.arguments));

            match self.confirm.confirm(request).await {
                Ok(outcome) if outcome.is_approved() => {
                    tracing::info!("Tool '{}' confirmed by user", call.name);
                }
                Ok(_) => {
                    tracing::info!("Tool '{}' declined by user", call.name);
                    return ToolResult::error(DECLINED_MESSAGE);
                }
                Err(e) => {
                    tracing::error!("Confirmation failed for '{}': {}", call.name, e);
                    return ToolResult::error(format!("Confirmation failed: {}", e));
                }
            }
        }

        match self.tools.execute(&call.name, call.arguments.clone()).await {
            Ok(result) => result,
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_confirm::MockConfirmation;
    use pet_model::{MockModel, ScriptedStep};
    use pet_tools::builtin::{EchoTool, OpenUrlTool};

    fn runtime_with(model: MockModel, confirm: MockConfirmation) -> AgentRuntime {
        let tools = ToolRegistry::new();
        tools.register(EchoTool).unwrap();
        tools.register(OpenUrlTool).unwrap();
        AgentRuntime::new(Arc::new(model), tools, Arc::new(confirm))
    }

    #[tokio::test]
    async fn test_plain_text_run() {
        let runtime = runtime_with(
            MockModel::always_text("你好，我是你的桌宠"),
            MockConfirmation::always_approve(),
        );

        let outcome = runtime
            .run(vec![ChatMessage::user("你好")], RunOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.text, "你好，我是你的桌宠");
        assert_eq!(outcome.steps, 1);
        assert!(outcome.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let model = MockModel::with_script(vec![
            ScriptedStep::tool_call("echo", serde_json::json!({"text": "ping"})),
            ScriptedStep::text("done"),
        ]);
        let runtime = runtime_with(model, MockConfirmation::always_approve());

        let outcome = runtime
            .run(vec![ChatMessage::user("run echo")], RunOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.text, "done");
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert!(outcome.tool_calls[0].result.success);
    }

    #[tokio::test]
    async fn test_declined_confirmation_is_in_band() {
        let model = MockModel::with_script(vec![
            ScriptedStep::tool_call("open_url", serde_json::json!({"url": "https://example.com"})),
            ScriptedStep::text("understood, not opening it"),
        ]);
        let runtime = runtime_with(model, MockConfirmation::always_deny());

        let outcome = runtime
            .run(vec![ChatMessage::user("open it")], RunOptions::default())
            .await
            .unwrap();

        // run continued to a final answer despite the denial
        assert_eq!(outcome.text, "understood, not opening it");
        let record = &outcome.tool_calls[0];
        assert!(!record.result.success);
        assert_eq!(record.result.error.as_deref(), Some(DECLINED_MESSAGE));
    }

    #[tokio::test]
    async fn test_confirmation_prompt_is_redacted() {
        let model = MockModel::with_script(vec![
            ScriptedStep::tool_call("open_url", serde_json::json!({"url": "https://example.com"})),
            ScriptedStep::text("ok"),
        ]);
        let confirm = MockConfirmation::always_approve();

        let tools = ToolRegistry::new();
        tools.register(OpenUrlTool).unwrap();
        let confirm = Arc::new(confirm);
        let runtime = AgentRuntime::new(Arc::new(model), tools, confirm.clone());

        runtime
            .run(vec![ChatMessage::user("open")], RunOptions::default())
            .await
            .unwrap();

        let seen = confirm.seen_requests();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].prompt.contains("open_url"));
    }

    #[tokio::test]
    async fn test_allow_list_filters_execution() {
        let model = MockModel::with_script(vec![
            ScriptedStep::tool_call("echo", serde_json::json!({"text": "hi"})),
            ScriptedStep::text("fine"),
        ]);
        let runtime = runtime_with(model, MockConfirmation::always_approve());

        let outcome = runtime
            .run(
                vec![ChatMessage::user("go")],
                RunOptions::default().with_enabled_tools(["open_url"]),
            )
            .await
            .unwrap();

        let record = &outcome.tool_calls[0];
        assert!(!record.result.success);
        assert!(record.result.error.as_deref().unwrap().contains("not enabled"));
    }

    #[tokio::test]
    async fn test_max_steps_cap() {
        // model asks for a tool on every step and never answers
        let steps: Vec<ScriptedStep> = (0..10)
            .map(|_| ScriptedStep::tool_call("echo", serde_json::json!({"text": "again"})))
            .collect();
        let runtime = runtime_with(
            MockModel::with_script(steps),
            MockConfirmation::always_approve(),
        );

        let result = runtime
            .run(
                vec![ChatMessage::user("loop")],
                RunOptions::default().with_max_steps(3),
            )
            .await;

        assert!(matches!(result, Err(RuntimeError::MaxStepsExceeded(3))));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_in_band_failure() {
        let model = MockModel::with_script(vec![
            ScriptedStep::tool_call("no_such_tool", serde_json::json!({})),
            ScriptedStep::text("sorry"),
        ]);
        let runtime = runtime_with(model, MockConfirmation::always_approve());

        let outcome = runtime
            .run(vec![ChatMessage::user("go")], RunOptions::default())
            .await
            .unwrap();

        assert!(!outcome.tool_calls[0].result.success);
        assert_eq!(outcome.text, "sorry");
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let model = MockModel::with_script(vec![
            ScriptedStep::tool_call("echo", serde_json::json!({"text": "hi"})),
            ScriptedStep::text("done"),
        ]);
        let runtime = runtime_with(model, MockConfirmation::always_approve());

        let (tx, mut rx) = mpsc::unbounded_channel();
        runtime
            .run_with_events(vec![ChatMessage::user("go")], RunOptions::default(), Some(tx))
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event {
                RunEvent::TextChunk { .. } => "text",
                RunEvent::ToolCallStart { .. } => "start",
                RunEvent::ToolCallEnd { .. } => "end",
                RunEvent::Done { .. } => "done",
                RunEvent::Error { .. } => "error",
            });
        }

        assert!(kinds.contains(&"start"));
        assert!(kinds.contains(&"end"));
        assert_eq!(kinds.last(), Some(&"done"));
    }

    #[tokio::test]
    async fn test_abort_before_run() {
        let runtime = runtime_with(
            MockModel::always_text("never seen"),
            MockConfirmation::always_approve(),
        );

        assert!(!runtime.is_running());
        // aborting with nothing in flight is a no-op
        runtime.abort();
    }
}
