//! Hosted agent instance
//!
//! Wraps an [`AgentHandler`] with the machinery every agent shares:
//! idempotent initialization, the enabled gate, a timeout race around
//! execution, error-to-result conversion, an allow-listed tool registry,
//! and a bounded log ring. The dispatcher only ever talks to instances.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use pet_tools::{ToolRegistry, ToolResult};

use crate::{
    handler::AgentHandler,
    logbuf::{LogBuffer, LogEntry, LogLevel},
    AgentConfig, AgentContext, AgentError, AgentMetadata, AgentResult, AgentTrigger, Result,
};

/// A hosted agent
pub struct AgentInstance {
    handler: Arc<dyn AgentHandler>,
    metadata: AgentMetadata,
    config: RwLock<AgentConfig>,
    triggers: RwLock<Vec<AgentTrigger>>,
    tools: ToolRegistry,
    logs: LogBuffer,
    initialized: AtomicBool,
}

impl AgentInstance {
    /// Host a handler
    pub fn new(handler: Arc<dyn AgentHandler>) -> Self {
        let metadata = handler.metadata();
        let config = handler.default_config();
        let triggers = handler.triggers();

        Self {
            handler,
            metadata,
            config: RwLock::new(config),
            triggers: RwLock::new(triggers),
            tools: ToolRegistry::new(),
            logs: LogBuffer::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Static identity
    pub fn metadata(&self) -> &AgentMetadata {
        &self.metadata
    }

    /// Agent id shorthand
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> AgentConfig {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the configuration
    pub fn update_config(&self, config: AgentConfig) {
        self.log(LogLevel::Info, "Configuration updated", None);
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }

    /// The agent's own tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Declared triggers
    pub fn triggers(&self) -> Vec<AgentTrigger> {
        self.triggers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Add a trigger to the declaration list
    ///
    /// The dispatcher is responsible for syncing the list into the
    /// trigger manager.
    pub fn add_trigger(&self, trigger: AgentTrigger) {
        self.triggers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(trigger);
    }

    /// Remove a trigger by id; returns whether anything was removed
    pub fn remove_trigger(&self, trigger_id: &str) -> bool {
        let mut triggers = self.triggers.write().unwrap_or_else(|e| e.into_inner());
        let before = triggers.len();
        triggers.retain(|t| t.id != trigger_id);
        triggers.len() < before
    }

    /// Enable or disable a declared trigger; returns whether it was found
    pub fn set_trigger_enabled(&self, trigger_id: &str, enabled: bool) -> bool {
        let mut triggers = self.triggers.write().unwrap_or_else(|e| e.into_inner());
        for trigger in triggers.iter_mut() {
            if trigger.id == trigger_id {
                trigger.enabled = enabled;
                return true;
            }
        }
        false
    }

    /// One-time initialization
    ///
    /// Idempotent: a second call warns and returns without re-running
    /// hooks or duplicating tool registration.
    pub async fn initialize(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::warn!("Agent {} already initialized", self.id());
            self.log(LogLevel::Warn, "initialize() called twice", None);
            return Ok(());
        }

        self.handler.register_tools(&self.tools);

        if let Err(e) = self.handler.on_initialize(self).await {
            // allow a later retry after a failed init
            self.initialized.store(false, Ordering::SeqCst);
            return Err(e);
        }

        self.log(LogLevel::Info, "Agent initialized", None);
        Ok(())
    }

    /// Whether `initialize` has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Execute the agent for one context
    ///
    /// Never returns `Err`: every failure mode (hook error, timeout,
    /// disabled agent) is folded into the returned [`AgentResult`] so the
    /// dispatcher needs no per-agent exception handling. A measured
    /// duration is always attached.
    pub async fn execute(&self, ctx: &AgentContext) -> AgentResult {
        let started = Instant::now();

        if !self.is_initialized() {
            if let Err(e) = self.initialize().await {
                let mut result = AgentResult::fail(format!("Initialization failed: {}", e));
                result.duration_ms = Some(started.elapsed().as_millis() as u64);
                return result;
            }
        }

        let (enabled, timeout_ms) = {
            let config = self.config.read().unwrap_or_else(|e| e.into_inner());
            (config.enabled, config.timeout_ms)
        };

        if !enabled {
            let mut result = AgentResult::ok("Agent disabled, skipped");
            result.duration_ms = Some(started.elapsed().as_millis() as u64);
            return result;
        }

        let outcome = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.handler.on_execute(ctx, self),
        )
        .await;

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                self.log(LogLevel::Error, &format!("Execution failed: {}", e), None);
                AgentResult::fail(e.to_string())
            }
            Err(_) => {
                let err = AgentError::Timeout(timeout_ms);
                self.log(LogLevel::Error, &err.to_string(), None);
                AgentResult::fail(err.to_string())
            }
        };

        result.duration_ms = Some(started.elapsed().as_millis() as u64);
        result
    }

    /// Relevance veto, delegated to the handler
    pub async fn should_trigger(&self, ctx: &AgentContext) -> bool {
        self.handler.should_trigger(ctx).await
    }

    /// Teardown
    pub async fn cleanup(&self) -> Result<()> {
        self.handler.on_cleanup().await?;
        self.initialized.store(false, Ordering::SeqCst);
        self.log(LogLevel::Info, "Agent cleaned up", None);
        Ok(())
    }

    /// Call a tool from the agent's own registry
    ///
    /// Honors the configured allow-list (empty = unrestricted). All
    /// failures come back as error results, never as `Err`.
    pub async fn call_tool(&self, name: &str, args: Value) -> ToolResult {
        let allowed = {
            let config = self.config.read().unwrap_or_else(|e| e.into_inner());
            config.tools.is_empty() || config.tools.iter().any(|t| t == name)
        };

        if !allowed {
            return ToolResult::error(format!("Tool '{}' is not allowed for this agent", name));
        }

        if !self.tools.has_tool(name) {
            return ToolResult::error(format!("Tool not found: {}", name));
        }

        match self.tools.execute(name, args).await {
            Ok(result) => result,
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    /// Append to the agent's log ring, mirrored to tracing
    pub fn log(&self, level: LogLevel, message: &str, data: Option<Value>) {
        match level {
            LogLevel::Debug => tracing::debug!(agent = %self.id(), "{}", message),
            LogLevel::Info => tracing::info!(agent = %self.id(), "{}", message),
            LogLevel::Warn => tracing::warn!(agent = %self.id(), "{}", message),
            LogLevel::Error => tracing::error!(agent = %self.id(), "{}", message),
        }
        self.logs.push(level, message, data);
    }

    /// Snapshot of the log ring
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.logs.entries()
    }

    /// Clear the log ring
    pub fn clear_logs(&self) {
        self.logs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_context, ContextSeed, TriggerSource};
    use async_trait::async_trait;
    use pet_tools::builtin::EchoTool;
    use std::sync::atomic::AtomicUsize;

    struct TestAgent {
        init_count: AtomicUsize,
        delay_ms: u64,
        fail: bool,
    }

    impl TestAgent {
        fn quick() -> Self {
            Self {
                init_count: AtomicUsize::new(0),
                delay_ms: 0,
                fail: false,
            }
        }

        fn slow(delay_ms: u64) -> Self {
            Self {
                init_count: AtomicUsize::new(0),
                delay_ms,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                init_count: AtomicUsize::new(0),
                delay_ms: 0,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl AgentHandler for TestAgent {
        fn metadata(&self) -> AgentMetadata {
            AgentMetadata::new("test-agent", "Test Agent", "An agent for tests")
        }

        fn register_tools(&self, tools: &ToolRegistry) {
            tools.register_or_replace(EchoTool);
        }

        async fn on_initialize(&self, _host: &AgentInstance) -> Result<()> {
            self.init_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_execute(&self, ctx: &AgentContext, _host: &AgentInstance) -> Result<AgentResult> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.fail {
                return Err(AgentError::execution("deliberate failure"));
            }
            Ok(AgentResult::ok(format!(
                "handled: {}",
                ctx.user_message.as_deref().unwrap_or("")
            )))
        }
    }

    fn ctx(message: &str) -> AgentContext {
        build_context(
            "user-1",
            TriggerSource::UserMessage,
            ContextSeed {
                user_message: Some(message.to_string()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_idempotent_initialize() {
        let handler = Arc::new(TestAgent::quick());
        let instance = AgentInstance::new(handler.clone());

        instance.initialize().await.unwrap();
        instance.initialize().await.unwrap();

        assert_eq!(handler.init_count.load(Ordering::SeqCst), 1);
        assert_eq!(instance.tools().count(), 1);

        // the second call left a warning in the ring
        let warned = instance
            .get_logs()
            .iter()
            .any(|e| e.level == LogLevel::Warn);
        assert!(warned);
    }

    #[tokio::test]
    async fn test_execute_lazily_initializes() {
        let handler = Arc::new(TestAgent::quick());
        let instance = AgentInstance::new(handler.clone());

        let result = instance.execute(&ctx("hi")).await;
        assert!(result.success);
        assert_eq!(handler.init_count.load(Ordering::SeqCst), 1);
        assert!(result.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_disabled_agent_skips() {
        let instance = AgentInstance::new(Arc::new(TestAgent::quick()));
        let mut config = instance.config();
        config.enabled = false;
        instance.update_config(config);

        let result = instance.execute(&ctx("hi")).await;
        assert!(result.success);
        assert!(result.message.as_deref().unwrap().contains("disabled"));
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let instance = AgentInstance::new(Arc::new(TestAgent::slow(500)));
        let mut config = instance.config();
        config.timeout_ms = 20;
        instance.update_config(config);

        let result = instance.execute(&ctx("hi")).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_execute_contains_handler_error() {
        let instance = AgentInstance::new(Arc::new(TestAgent::failing()));

        let result = instance.execute(&ctx("hi")).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("deliberate"));
    }

    #[tokio::test]
    async fn test_call_tool_allow_list() {
        let instance = AgentInstance::new(Arc::new(TestAgent::quick()));
        instance.initialize().await.unwrap();

        // unrestricted by default
        let result = instance
            .call_tool("echo", serde_json::json!({"text": "hi"}))
            .await;
        assert!(result.success);

        // restrict away from echo
        let mut config = instance.config();
        config.tools = vec!["open_url".to_string()];
        instance.update_config(config);

        let result = instance
            .call_tool("echo", serde_json::json!({"text": "hi"}))
            .await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("not allowed"));
    }

    #[tokio::test]
    async fn test_call_tool_missing_is_error_result() {
        let instance = AgentInstance::new(Arc::new(TestAgent::quick()));
        instance.initialize().await.unwrap();

        let result = instance.call_tool("nonexistent", serde_json::json!({})).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_trigger_helpers() {
        let instance = AgentInstance::new(Arc::new(TestAgent::quick()));
        assert!(instance.triggers().is_empty());

        instance.add_trigger(AgentTrigger::interval("tick", 60));
        assert_eq!(instance.triggers().len(), 1);

        assert!(instance.set_trigger_enabled("tick", false));
        assert!(!instance.triggers()[0].enabled);

        assert!(instance.remove_trigger("tick"));
        assert!(instance.triggers().is_empty());
        assert!(!instance.remove_trigger("tick"));
    }
}
