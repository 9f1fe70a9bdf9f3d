//! Agent behavior trait

use async_trait::async_trait;
use pet_tools::ToolRegistry;

use crate::{instance::AgentInstance, AgentConfig, AgentContext, AgentMetadata, AgentResult,
    AgentTrigger, Result};

/// Behavior of one agent type
///
/// Implementations supply identity, declared triggers, and the execution
/// hook; [`AgentInstance`] hosts them with timeout, config gating, and
/// error containment, so hooks may fail freely with `?`.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// Static identity
    fn metadata(&self) -> AgentMetadata;

    /// Triggers this agent wants registered
    fn triggers(&self) -> Vec<AgentTrigger> {
        Vec::new()
    }

    /// Initial configuration
    fn default_config(&self) -> AgentConfig {
        AgentConfig::default()
    }

    /// Register built-in tools into the agent's own registry
    ///
    /// Called exactly once, before `on_initialize`.
    fn register_tools(&self, _tools: &ToolRegistry) {}

    /// One-time setup hook
    async fn on_initialize(&self, _host: &AgentInstance) -> Result<()> {
        Ok(())
    }

    /// The agent's business logic
    async fn on_execute(&self, ctx: &AgentContext, host: &AgentInstance) -> Result<AgentResult>;

    /// Teardown hook
    async fn on_cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Cheap relevance veto, checked before execution
    ///
    /// Returning false short-circuits with a successful "skipped" result;
    /// it is not an error.
    async fn should_trigger(&self, _ctx: &AgentContext) -> bool {
        true
    }
}
