//! Inter-node messaging and message statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// One message in a workflow run's append-only log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    pub timestamp: DateTime<Utc>,
}

impl WorkflowMessage {
    pub fn new(from: &str, to: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from: from.to_string(),
            to: to.to_string(),
            content: content.to_string(),
            metadata: None,
            timestamp: Utc::now(),
        }
    }
}

/// Sent/received counts for one participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageCounts {
    pub sent: usize,
    pub received: usize,
}

/// Per-participant message counts over a run's log
pub fn message_counts(messages: &[WorkflowMessage]) -> HashMap<String, MessageCounts> {
    let mut counts: HashMap<String, MessageCounts> = HashMap::new();
    for msg in messages {
        counts.entry(msg.from.clone()).or_default().sent += 1;
        counts.entry(msg.to.clone()).or_default().received += 1;
    }
    counts
}

/// Average time between a message to a participant and that participant's
/// next message back, in milliseconds. `None` when no such pair exists.
pub fn average_response_time_ms(messages: &[WorkflowMessage], participant: &str) -> Option<f64> {
    let mut total_ms: i64 = 0;
    let mut pairs: usize = 0;

    for (i, incoming) in messages.iter().enumerate() {
        if incoming.to != participant {
            continue;
        }
        if let Some(reply) = messages[i + 1..]
            .iter()
            .find(|m| m.from == participant && m.to == incoming.from)
        {
            total_ms += (reply.timestamp - incoming.timestamp).num_milliseconds().max(0);
            pairs += 1;
        }
    }

    if pairs == 0 {
        None
    } else {
        Some(total_ms as f64 / pairs as f64)
    }
}
