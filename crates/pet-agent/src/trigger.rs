//! Trigger declaration types
//!
//! Agents declare triggers bottom-up; the dispatcher registers them into
//! the trigger manager top-down. The agent itself never talks to the
//! trigger manager.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Per-type trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fires on a fixed interval or cron expression
    Schedule {
        /// Interval in seconds
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interval_seconds: Option<u64>,

        /// 5-field cron expression (minute hour day month weekday)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cron: Option<String>,
    },

    /// Fires when a named event is emitted
    Event {
        /// Event name to listen for
        event_name: String,

        /// All filter keys must equal the corresponding payload keys
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        filter: HashMap<String, Value>,
    },

    /// Fires when a registered evaluator resolves truthy
    Condition {
        /// Key of the registered evaluator
        expression: String,

        /// Polling interval in milliseconds
        check_interval_ms: u64,

        /// Minimum time between fires, in milliseconds
        #[serde(default)]
        cooldown_ms: u64,
    },

    /// Matched on demand against incoming user messages
    UserMessage {
        /// Keywords scored against the message
        #[serde(default)]
        keywords: Vec<String>,

        /// Catch-all fallback when no keywords match
        #[serde(default)]
        is_default: bool,
    },
}

/// A trigger as declared by an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTrigger {
    /// Trigger id, unique within the owning agent
    pub id: String,

    /// Type and type-specific configuration
    #[serde(flatten)]
    pub kind: TriggerKind,

    /// Whether the trigger is armed
    pub enabled: bool,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
}

impl AgentTrigger {
    /// Create an enabled trigger
    pub fn new<S: Into<String>>(id: S, kind: TriggerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: true,
            description: None,
        }
    }

    /// Interval schedule helper
    pub fn interval<S: Into<String>>(id: S, seconds: u64) -> Self {
        Self::new(
            id,
            TriggerKind::Schedule {
                interval_seconds: Some(seconds),
                cron: None,
            },
        )
    }

    /// Cron schedule helper
    pub fn cron<S: Into<String>>(id: S, expression: S) -> Self {
        Self::new(
            id,
            TriggerKind::Schedule {
                interval_seconds: None,
                cron: Some(expression.into()),
            },
        )
    }

    /// User-message trigger helper
    pub fn user_message<S: Into<String>>(id: S, keywords: Vec<String>) -> Self {
        Self::new(
            id,
            TriggerKind::UserMessage {
                keywords,
                is_default: false,
            },
        )
    }

    /// Set the description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Disable the trigger
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
