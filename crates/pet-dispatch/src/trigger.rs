//! Trigger registration and activation
//!
//! The manager owns every armed trigger. Schedule and condition triggers
//! run on their own tokio timers; event triggers wait for [`TriggerManager::emit_event`];
//! user-message triggers are matched on demand by the dispatcher. Firing a
//! trigger never executes an agent directly, it only invokes the callback
//! installed at [`TriggerManager::start`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use dashmap::DashMap;
use pet_agent::{AgentTrigger, TriggerKind, TriggerSource};
use serde_json::Value;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{DispatchError, Result};

/// A trigger firing, handed to the dispatcher callback
#[derive(Debug, Clone)]
pub struct TriggerFire {
    pub agent_id: String,
    pub trigger_id: String,
    pub source: TriggerSource,

    /// Event payload, present for event triggers only
    pub payload: Option<Value>,
}

/// Installed by the dispatcher; must not block
pub type TriggerCallback = Arc<dyn Fn(TriggerFire) + Send + Sync>;

/// Evaluates a condition trigger's expression
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn evaluate(&self) -> bool;
}

/// A user-message trigger that matched, with its relevance score
#[derive(Debug, Clone)]
pub struct TriggerMatch {
    pub agent_id: String,
    pub trigger_id: String,
    pub score: f64,
}

/// Score a default (catch-all) user-message trigger receives when none of
/// its keywords matched
const DEFAULT_MATCH_SCORE: f64 = 0.1;

struct Registration {
    agent_id: String,
    trigger: AgentTrigger,
    last_triggered_at: Option<DateTime<Utc>>,
    trigger_count: u64,
}

struct TriggerManagerInner {
    /// Keyed by `{agent_id}/{trigger_id}`
    triggers: DashMap<String, Registration>,
    timers: DashMap<String, JoinHandle<()>>,
    evaluators: DashMap<String, Arc<dyn ConditionEvaluator>>,
    callback: RwLock<Option<TriggerCallback>>,
    running: AtomicBool,
}

/// Registry and scheduler for agent triggers
#[derive(Clone)]
pub struct TriggerManager {
    inner: Arc<TriggerManagerInner>,
}

fn key(agent_id: &str, trigger_id: &str) -> String {
    format!("{}/{}", agent_id, trigger_id)
}

/// Parse a 5-field cron expression by padding a seconds field in front.
/// 6-field expressions pass through unchanged.
pub fn parse_cron(expression: &str) -> Result<Schedule> {
    let fields = expression.split_whitespace().count();
    let padded;
    let effective = if fields == 5 {
        padded = format!("0 {}", expression);
        padded.as_str()
    } else {
        expression
    };

    Schedule::from_str(effective).map_err(|e| DispatchError::InvalidCron {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

impl TriggerManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TriggerManagerInner {
                triggers: DashMap::new(),
                timers: DashMap::new(),
                evaluators: DashMap::new(),
                callback: RwLock::new(None),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Register a trigger for an agent. Activates immediately when the
    /// manager is already running.
    pub fn register_trigger(&self, agent_id: &str, trigger: AgentTrigger) {
        let k = key(agent_id, &trigger.id);
        debug!(agent_id, trigger_id = %trigger.id, "registering trigger");

        self.inner.triggers.insert(
            k.clone(),
            Registration {
                agent_id: agent_id.to_string(),
                trigger,
                last_triggered_at: None,
                trigger_count: 0,
            },
        );

        if self.inner.running.load(Ordering::SeqCst) {
            self.activate(&k);
        }
    }

    /// Remove one trigger, stopping its timer if any
    pub fn unregister_trigger(&self, agent_id: &str, trigger_id: &str) -> bool {
        let k = key(agent_id, trigger_id);
        if let Some((_, handle)) = self.inner.timers.remove(&k) {
            handle.abort();
        }
        self.inner.triggers.remove(&k).is_some()
    }

    /// Remove every trigger owned by an agent
    pub fn unregister_agent_triggers(&self, agent_id: &str) {
        let prefix = format!("{}/", agent_id);
        let keys: Vec<String> = self
            .inner
            .triggers
            .iter()
            .filter(|e| e.key().starts_with(&prefix))
            .map(|e| e.key().clone())
            .collect();

        for k in keys {
            if let Some((_, handle)) = self.inner.timers.remove(&k) {
                handle.abort();
            }
            self.inner.triggers.remove(&k);
        }
    }

    /// Arm or disarm a trigger without removing it
    pub fn set_trigger_enabled(&self, agent_id: &str, trigger_id: &str, enabled: bool) -> bool {
        match self.inner.triggers.get_mut(&key(agent_id, trigger_id)) {
            Some(mut reg) => {
                reg.trigger.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Register the evaluator a condition trigger's expression refers to
    pub fn register_evaluator(&self, expression: &str, evaluator: Arc<dyn ConditionEvaluator>) {
        self.inner
            .evaluators
            .insert(expression.to_string(), evaluator);
    }

    /// Install the callback and activate all registered triggers.
    /// Calling start on a running manager is a no-op.
    pub fn start(&self, callback: TriggerCallback) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("trigger manager already running");
            return;
        }

        {
            let mut cb = self
                .inner
                .callback
                .write()
                .unwrap_or_else(|e| e.into_inner());
            *cb = Some(callback);
        }

        let keys: Vec<String> = self.inner.triggers.iter().map(|e| e.key().clone()).collect();
        for k in keys {
            self.activate(&k);
        }
    }

    /// Stop all timers and drop the callback. Registrations survive stop.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        for entry in self.inner.timers.iter() {
            entry.value().abort();
        }
        self.inner.timers.clear();

        let mut cb = self
            .inner
            .callback
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *cb = None;
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Fire every enabled event trigger listening for `event_name` whose
    /// filter matches the payload
    pub fn emit_event(&self, event_name: &str, payload: Value) {
        let mut to_fire = Vec::new();

        for entry in self.inner.triggers.iter() {
            let reg = entry.value();
            if !reg.trigger.enabled {
                continue;
            }
            if let TriggerKind::Event {
                event_name: listened,
                filter,
            } = &reg.trigger.kind
            {
                if listened != event_name {
                    continue;
                }
                let matches = filter
                    .iter()
                    .all(|(k, v)| payload.get(k).is_some_and(|p| p == v));
                if matches {
                    to_fire.push(entry.key().clone());
                }
            }
        }

        for k in to_fire {
            self.fire(&k, TriggerSource::Event, Some(payload.clone()));
        }
    }

    /// Score enabled user-message triggers against a message.
    ///
    /// A trigger scores the fraction of its keywords found in the message
    /// (case-insensitive substring). Default triggers with no keyword match
    /// score [`DEFAULT_MATCH_SCORE`]. Zero-score triggers are omitted;
    /// results are sorted best first.
    pub fn match_user_message(&self, message: &str) -> Vec<TriggerMatch> {
        let lower = message.to_lowercase();
        let mut matches = Vec::new();

        for entry in self.inner.triggers.iter() {
            let reg = entry.value();
            if !reg.trigger.enabled {
                continue;
            }
            let TriggerKind::UserMessage {
                keywords,
                is_default,
            } = &reg.trigger.kind
            else {
                continue;
            };

            let mut score = if keywords.is_empty() {
                0.0
            } else {
                let hit = keywords
                    .iter()
                    .filter(|kw| lower.contains(&kw.to_lowercase()))
                    .count();
                hit as f64 / keywords.len() as f64
            };

            if score == 0.0 && *is_default {
                score = DEFAULT_MATCH_SCORE;
            }

            if score > 0.0 {
                matches.push(TriggerMatch {
                    agent_id: reg.agent_id.clone(),
                    trigger_id: reg.trigger.id.clone(),
                    score,
                });
            }
        }

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches
    }

    /// Record a fire without going through a timer. Used by the dispatcher
    /// when it routes a user message to a matched trigger.
    pub fn mark_fired(&self, agent_id: &str, trigger_id: &str) {
        if let Some(mut reg) = self.inner.triggers.get_mut(&key(agent_id, trigger_id)) {
            reg.last_triggered_at = Some(Utc::now());
            reg.trigger_count += 1;
        }
    }

    /// Times a trigger has fired, if registered
    pub fn trigger_count(&self, agent_id: &str, trigger_id: &str) -> Option<u64> {
        self.inner
            .triggers
            .get(&key(agent_id, trigger_id))
            .map(|r| r.trigger_count)
    }

    fn fire(&self, k: &str, source: TriggerSource, payload: Option<Value>) {
        if !self.inner.running.load(Ordering::SeqCst) {
            return;
        }

        let fire = {
            let Some(mut reg) = self.inner.triggers.get_mut(k) else {
                return;
            };
            if !reg.trigger.enabled {
                return;
            }
            reg.last_triggered_at = Some(Utc::now());
            reg.trigger_count += 1;
            TriggerFire {
                agent_id: reg.agent_id.clone(),
                trigger_id: reg.trigger.id.clone(),
                source,
                payload,
            }
        };

        let cb = {
            let guard = self.inner.callback.read().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(cb) = cb {
            debug!(agent_id = %fire.agent_id, trigger_id = %fire.trigger_id, "trigger fired");
            cb(fire);
        }
    }

    fn activate(&self, k: &str) {
        let Some(reg) = self.inner.triggers.get(k) else {
            return;
        };

        let handle = match &reg.trigger.kind {
            TriggerKind::Schedule {
                interval_seconds: Some(seconds),
                ..
            } => Some(self.spawn_interval(k.to_string(), *seconds)),
            TriggerKind::Schedule {
                cron: Some(expression),
                ..
            } => match parse_cron(expression) {
                Ok(schedule) => Some(self.spawn_cron(k.to_string(), schedule)),
                Err(e) => {
                    error!(trigger = k, error = %e, "cron trigger not activated");
                    None
                }
            },
            TriggerKind::Schedule { .. } => {
                warn!(trigger = k, "schedule trigger has neither interval nor cron");
                None
            }
            TriggerKind::Condition {
                expression,
                check_interval_ms,
                cooldown_ms,
            } => Some(self.spawn_condition(
                k.to_string(),
                expression.clone(),
                *check_interval_ms,
                *cooldown_ms,
            )),
            // matched on demand, no timer
            TriggerKind::Event { .. } | TriggerKind::UserMessage { .. } => None,
        };
        drop(reg);

        if let Some(handle) = handle {
            if let Some(old) = self.inner.timers.insert(k.to_string(), handle) {
                old.abort();
            }
        }
    }

    fn spawn_interval(&self, k: String, seconds: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let period = Duration::from_secs(seconds.max(1));
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.running.load(Ordering::SeqCst) {
                    break;
                }
                fire_via(&inner, &k, TriggerSource::Schedule, None);
            }
        })
    }

    fn spawn_cron(&self, k: String, schedule: Schedule) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let Some(next) = schedule.after(&Utc::now()).next() else {
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;

                let Some(inner) = weak.upgrade() else { break };
                if !inner.running.load(Ordering::SeqCst) {
                    break;
                }
                fire_via(&inner, &k, TriggerSource::Schedule, None);
            }
        })
    }

    fn spawn_condition(
        &self,
        k: String,
        expression: String,
        check_interval_ms: u64,
        cooldown_ms: u64,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let period = Duration::from_millis(check_interval_ms.max(1));
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.running.load(Ordering::SeqCst) {
                    break;
                }

                // cooldown gate, checked before the evaluator runs
                let in_cooldown = inner.triggers.get(&k).is_some_and(|reg| {
                    reg.last_triggered_at.is_some_and(|last| {
                        let elapsed = Utc::now() - last;
                        elapsed.num_milliseconds() < cooldown_ms as i64
                    })
                });
                if in_cooldown {
                    continue;
                }

                let Some(evaluator) = inner.evaluators.get(&expression).map(|e| Arc::clone(e.value()))
                else {
                    debug!(expression = %expression, "no evaluator registered for condition");
                    continue;
                };

                if !evaluator.evaluate().await {
                    continue;
                }

                fire_via(&inner, &k, TriggerSource::Condition, None);
            }
        })
    }
}

impl Default for TriggerManager {
    fn default() -> Self {
        Self::new()
    }
}

fn fire_via(inner: &Arc<TriggerManagerInner>, k: &str, source: TriggerSource, payload: Option<Value>) {
    let manager = TriggerManager {
        inner: Arc::clone(inner),
    };
    manager.fire(k, source, payload);
}
