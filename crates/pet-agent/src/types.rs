//! Agent identity, configuration, context, and result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Dispatch priority of an agent
///
/// Order matters: lower variants are served first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AgentPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

/// Static identity of an agent type
///
/// Created once at agent construction and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetadata {
    /// Unique agent id
    pub id: String,

    /// Display name
    pub name: String,

    /// What the agent does
    pub description: String,

    /// Semantic version of the agent implementation
    pub version: String,

    /// Icon shown in the companion UI
    #[serde(default)]
    pub icon: Option<String>,

    /// UI category
    #[serde(default)]
    pub category: Option<String>,

    /// Dispatch priority
    #[serde(default)]
    pub priority: AgentPriority,

    /// Whether this is a built-in system agent
    #[serde(default)]
    pub is_system: bool,
}

impl AgentMetadata {
    /// Create metadata with required fields; the rest default
    pub fn new<S: Into<String>>(id: S, name: S, description: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            version: "1.0.0".to_string(),
            icon: None,
            category: None,
            priority: AgentPriority::Normal,
            is_system: false,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: AgentPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Mark as a system agent
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

/// Mutable per-agent runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Whether the agent may execute at all
    pub enabled: bool,

    /// Tool allow-list; empty means unrestricted
    #[serde(default)]
    pub tools: Vec<String>,

    /// Step cap handed to the runtime loop
    pub max_steps: usize,

    /// Per-execution timeout in milliseconds
    pub timeout_ms: u64,

    /// Free-form agent settings
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tools: Vec::new(),
            max_steps: 5,
            timeout_ms: 30_000,
            settings: HashMap::new(),
        }
    }
}

/// Where a dispatch originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Schedule,
    Event,
    Condition,
    UserMessage,
}

/// Snapshot of the user's profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Preferred display name
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form preference map
    #[serde(default)]
    pub preferences: HashMap<String, Value>,
}

/// One observed emotion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionRecord {
    /// Emotion label
    pub emotion: String,

    /// Intensity in [0, 1]
    pub intensity: f32,

    /// When it was observed
    pub timestamp: DateTime<Utc>,
}

/// Current state of the pet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetStatus {
    /// Current mood label
    pub mood: String,

    /// Energy in [0, 100]
    pub energy: u8,

    /// Last time the user interacted
    #[serde(default)]
    pub last_interaction_at: Option<DateTime<Utc>>,
}

impl Default for PetStatus {
    fn default() -> Self {
        Self {
            mood: "idle".to_string(),
            energy: 100,
            last_interaction_at: None,
        }
    }
}

/// Read-mostly snapshot handed to every execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    /// Owning user
    pub user_id: String,

    /// The message that triggered this dispatch, if any
    #[serde(default)]
    pub user_message: Option<String>,

    /// User profile snapshot
    pub user_profile: UserProfile,

    /// Recently observed emotions
    #[serde(default)]
    pub recent_emotions: Vec<EmotionRecord>,

    /// Pet state snapshot
    pub pet_status: PetStatus,

    /// When the context was built
    pub timestamp: DateTime<Utc>,

    /// What caused this dispatch
    pub trigger_source: TriggerSource,

    /// The specific trigger, if dispatch came through one
    #[serde(default)]
    pub trigger_id: Option<String>,

    /// Free-form extras
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Partial context as supplied by callers; missing parts are defaulted
#[derive(Debug, Clone, Default)]
pub struct ContextSeed {
    pub user_message: Option<String>,
    pub user_profile: Option<UserProfile>,
    pub recent_emotions: Option<Vec<EmotionRecord>>,
    pub pet_status: Option<PetStatus>,
    pub trigger_id: Option<String>,
    pub metadata: Option<Value>,
}

/// Build a complete context from a seed
///
/// Every structured sub-object gets a default when missing, so agent code
/// never needs to handle absent profiles or statuses.
pub fn build_context(user_id: &str, source: TriggerSource, seed: ContextSeed) -> AgentContext {
    AgentContext {
        user_id: user_id.to_string(),
        user_message: seed.user_message,
        user_profile: seed.user_profile.unwrap_or_default(),
        recent_emotions: seed.recent_emotions.unwrap_or_default(),
        pet_status: seed.pet_status.unwrap_or_default(),
        timestamp: Utc::now(),
        trigger_source: source,
        trigger_id: seed.trigger_id,
        metadata: seed.metadata,
    }
}

/// Result produced by an agent execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResult {
    /// Whether the execution succeeded
    pub success: bool,

    /// Message to surface (chat bubble, notification)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Error description when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether the companion should speak the message aloud
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_speak: Option<bool>,

    /// Emotion to display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,

    /// Animation to play
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,

    /// Actions for the shell to perform
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Value>,

    /// Structured result data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Wall-clock duration in milliseconds, set by the execution wrapper
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl AgentResult {
    /// Create a successful result with a message
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create a failed result
    pub fn fail<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Attach structured data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the displayed emotion
    pub fn with_emotion<S: Into<String>>(mut self, emotion: S) -> Self {
        self.emotion = Some(emotion.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(AgentPriority::Critical < AgentPriority::High);
        assert!(AgentPriority::High < AgentPriority::Normal);
        assert!(AgentPriority::Normal < AgentPriority::Low);
    }

    #[test]
    fn test_build_context_fills_defaults() {
        let ctx = build_context("user-1", TriggerSource::UserMessage, ContextSeed::default());

        assert_eq!(ctx.user_id, "user-1");
        assert_eq!(ctx.pet_status.mood, "idle");
        assert!(ctx.recent_emotions.is_empty());
        assert_eq!(ctx.trigger_source, TriggerSource::UserMessage);
    }

    #[test]
    fn test_build_context_keeps_supplied_parts() {
        let seed = ContextSeed {
            user_message: Some("今天天气怎么样".to_string()),
            pet_status: Some(PetStatus {
                mood: "happy".to_string(),
                energy: 80,
                last_interaction_at: None,
            }),
            ..Default::default()
        };

        let ctx = build_context("user-1", TriggerSource::UserMessage, seed);
        assert_eq!(ctx.user_message.as_deref(), Some("今天天气怎么样"));
        assert_eq!(ctx.pet_status.mood, "happy");
    }

    #[test]
    fn test_result_constructors() {
        let ok = AgentResult::ok("done").with_emotion("happy");
        assert!(ok.success);
        assert_eq!(ok.emotion.as_deref(), Some("happy"));

        let fail = AgentResult::fail("boom");
        assert!(!fail.success);
        assert_eq!(fail.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_config_default() {
        let config = AgentConfig::default();
        assert!(config.enabled);
        assert!(config.tools.is_empty());
        assert_eq!(config.timeout_ms, 30_000);
    }
}
