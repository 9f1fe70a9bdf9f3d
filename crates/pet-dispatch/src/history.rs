//! Bounded execution history

use chrono::{DateTime, Utc};
use pet_agent::TriggerSource;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Audit entry for one settled task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Task id
    pub id: String,

    /// Agent that ran
    pub agent_id: String,

    /// Agent display name at execution time
    pub agent_name: String,

    /// What caused the dispatch
    pub trigger_source: TriggerSource,

    /// When execution began
    pub started_at: DateTime<Utc>,

    /// When execution settled
    pub completed_at: DateTime<Utc>,

    /// Whether the final attempt succeeded
    pub success: bool,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Result message, if any
    #[serde(default)]
    pub message: Option<String>,

    /// Error description, if failed
    #[serde(default)]
    pub error: Option<String>,

    /// Retries before settling
    pub retry_count: u32,
}

/// Fixed-capacity ring of execution records, oldest evicted first
#[derive(Debug)]
pub struct ExecutionHistory {
    records: VecDeque<ExecutionRecord>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, record: ExecutionRecord) {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Most recent records first, up to `limit`
    pub fn recent(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fraction of recorded executions that succeeded; 1.0 when empty
    pub fn success_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 1.0;
        }
        let ok = self.records.iter().filter(|r| r.success).count();
        ok as f64 / self.records.len() as f64
    }

    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.success).count()
    }
}
