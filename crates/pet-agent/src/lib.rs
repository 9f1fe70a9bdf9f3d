//! Pet Agent
//!
//! The agent abstraction of the companion core: identity and config
//! types, the behavior trait, trigger declarations, and the hosted
//! instance that wraps every agent with timeout, error containment, and a
//! bounded log ring.

pub mod error;
pub mod handler;
pub mod instance;
pub mod logbuf;
pub mod trigger;
pub mod types;

pub use error::{AgentError, Result};
pub use handler::AgentHandler;
pub use instance::AgentInstance;
pub use logbuf::{LogBuffer, LogEntry, LogLevel};
pub use trigger::{AgentTrigger, TriggerKind};
pub use types::{
    build_context, AgentConfig, AgentContext, AgentMetadata, AgentPriority, AgentResult,
    ContextSeed, EmotionRecord, PetStatus, TriggerSource, UserProfile,
};
