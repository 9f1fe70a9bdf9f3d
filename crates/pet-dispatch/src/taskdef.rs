//! Persisted task definitions
//!
//! The shell stores scheduled tasks in configuration using camelCase JSON;
//! this module is the typed view of that schema. Timestamps are epoch
//! milliseconds, as stored.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::trigger::parse_cron;

/// What causes a task to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    #[serde(rename_all = "camelCase")]
    Interval { seconds: i64 },

    #[serde(rename_all = "camelCase")]
    Cron { expression: String },

    #[serde(rename_all = "camelCase")]
    Event { event_name: String },

    Manual,
}

/// What a due task does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    #[serde(rename_all = "camelCase")]
    Notification {
        title: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_button: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_callback: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    AgentTask {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tools_allowed: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_steps: Option<i64>,
    },

    #[serde(rename_all = "camelCase")]
    Workflow {
        workflow_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    Script {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
}

impl ActionConfig {
    /// Payload emitted to the shell when the action runs
    ///
    /// Script actions are refused: the shell has no sandbox for them.
    pub fn payload(&self) -> Result<Value> {
        match self {
            Self::Notification {
                title,
                body,
                action_button,
                action_callback,
            } => Ok(json!({
                "title": title,
                "body": body,
                "actionButton": action_button,
                "actionCallback": action_callback,
            })),
            Self::AgentTask {
                prompt,
                tools_allowed,
                max_steps,
            } => Ok(json!({
                "prompt": prompt,
                "toolsAllowed": tools_allowed,
                "maxSteps": max_steps,
            })),
            Self::Workflow { workflow_id, input } => Ok(json!({
                "workflowId": workflow_id,
                "input": input,
            })),
            Self::Script { .. } => Err(DispatchError::Other(
                "script action is not supported yet".to_string(),
            )),
        }
    }
}

/// A stored scheduled task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub trigger: TriggerConfig,
    pub action: ActionConfig,
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl TaskDefinition {
    /// Create an enabled definition with its first `next_run` computed
    pub fn new(name: &str, trigger: TriggerConfig, action: ActionConfig, now_ms: i64) -> Self {
        let next_run = compute_next_run(&trigger, now_ms);
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            trigger,
            action,
            enabled: true,
            last_run: None,
            next_run,
            metadata: None,
            created_at: now_ms,
            updated_at: None,
        }
    }

    /// Whether the task should run at `now_ms`
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.enabled && self.next_run.is_some_and(|n| n <= now_ms)
    }

    /// Advance run bookkeeping after an execution settles
    pub fn mark_run(&mut self, now_ms: i64) {
        self.last_run = Some(now_ms);
        self.next_run = compute_next_run(&self.trigger, now_ms);
        self.updated_at = Some(now_ms);
        debug!(task = %self.id, next_run = ?self.next_run, "task run recorded");
    }
}

/// Next due time in epoch milliseconds, or `None` for triggers that never
/// fire on their own (event, manual) and unparseable cron expressions
pub fn compute_next_run(trigger: &TriggerConfig, from_ms: i64) -> Option<i64> {
    match trigger {
        TriggerConfig::Interval { seconds } => {
            if *seconds <= 0 {
                return None;
            }
            Some(from_ms + seconds * 1000)
        }
        TriggerConfig::Cron { expression } => {
            let schedule = parse_cron(expression).ok()?;
            let from = chrono::TimeZone::timestamp_millis_opt(&chrono::Utc, from_ms).single()?;
            schedule
                .after(&from)
                .next()
                .map(|dt| dt.timestamp_millis())
        }
        TriggerConfig::Event { .. } | TriggerConfig::Manual => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_round_trip() {
        let def = TaskDefinition {
            id: "t1".to_string(),
            name: "morning brief".to_string(),
            description: Some("daily summary".to_string()),
            trigger: TriggerConfig::Cron {
                expression: "0 9 * * *".to_string(),
            },
            action: ActionConfig::AgentTask {
                prompt: "总结今天的日程".to_string(),
                tools_allowed: Some(vec!["current_time".to_string()]),
                max_steps: Some(3),
            },
            enabled: true,
            last_run: None,
            next_run: Some(1_700_000_000_000),
            metadata: None,
            created_at: 1_690_000_000_000,
            updated_at: None,
        };

        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["trigger"]["type"], "cron");
        assert_eq!(json["action"]["type"], "agent_task");
        assert_eq!(json["action"]["toolsAllowed"][0], "current_time");
        assert_eq!(json["action"]["maxSteps"], 3);
        assert_eq!(json["createdAt"], 1_690_000_000_000i64);
        assert_eq!(json["nextRun"], 1_700_000_000_000i64);

        let back: TaskDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back.trigger, def.trigger);
        assert_eq!(back.action, def.action);
    }

    #[test]
    fn test_interval_next_run() {
        let next = compute_next_run(&TriggerConfig::Interval { seconds: 60 }, 1_000_000);
        assert_eq!(next, Some(1_000_000 + 60_000));

        assert_eq!(
            compute_next_run(&TriggerConfig::Interval { seconds: 0 }, 1_000_000),
            None
        );
    }

    #[test]
    fn test_cron_next_run_lands_on_schedule() {
        let from_ms = 1_690_000_123_456i64;
        let next = compute_next_run(
            &TriggerConfig::Cron {
                expression: "*/5 * * * *".to_string(),
            },
            from_ms,
        )
        .unwrap();

        assert!(next > from_ms);
        // minute aligned and on a five-minute boundary
        assert_eq!(next % 60_000, 0);
        assert_eq!((next / 60_000) % 5, 0);
    }

    #[test]
    fn test_event_and_manual_never_self_schedule() {
        assert_eq!(
            compute_next_run(
                &TriggerConfig::Event {
                    event_name: "x".to_string()
                },
                0
            ),
            None
        );
        assert_eq!(compute_next_run(&TriggerConfig::Manual, 0), None);
    }

    #[test]
    fn test_script_action_unsupported() {
        let action = ActionConfig::Script { command: None };
        assert!(action.payload().is_err());
    }

    #[test]
    fn test_mark_run_advances() {
        let mut def = TaskDefinition::new(
            "heartbeat",
            TriggerConfig::Interval { seconds: 30 },
            ActionConfig::Notification {
                title: "hi".to_string(),
                body: "still here".to_string(),
                action_button: None,
                action_callback: None,
            },
            1_000_000,
        );
        assert_eq!(def.next_run, Some(1_030_000));
        assert!(def.is_due(1_030_000));
        assert!(!def.is_due(1_029_999));

        def.mark_run(1_031_000);
        assert_eq!(def.last_run, Some(1_031_000));
        assert_eq!(def.next_run, Some(1_061_000));
    }
}
