//! Agent registration, trigger routing, and the task queue
//!
//! The dispatcher owns one priority queue and one set of active task ids,
//! both behind a single mutex. Queue processing is driven by a fixed tick;
//! each tick starts as many pending tasks as the concurrency cap allows.

use dashmap::DashMap;
use pet_agent::{
    build_context, AgentContext, AgentInstance, AgentResult, ContextSeed, TriggerSource,
};
use pet_core::DispatcherSettings;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{DispatchError, Result};
use crate::history::{ExecutionHistory, ExecutionRecord};
use crate::task::{AgentTask, TaskStatus};
use crate::trigger::{TriggerCallback, TriggerFire, TriggerManager, TriggerMatch};

/// Dispatcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Paused,
}

/// Per-agent bookkeeping kept by the dispatcher
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentStatus {
    pub execution_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub last_executed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub init_failed: bool,
}

/// Aggregate dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStats {
    pub agents: usize,
    pub queued: usize,
    pub active: usize,
    pub total_executions: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub success_rate: f64,
}

struct QueueState {
    queue: VecDeque<AgentTask>,
    active: HashSet<String>,
}

struct DispatcherInner {
    settings: DispatcherSettings,
    user_id: String,
    agents: DashMap<String, Arc<AgentInstance>>,
    statuses: DashMap<String, AgentStatus>,
    queue: Mutex<QueueState>,
    history: Mutex<ExecutionHistory>,
    triggers: TriggerManager,
    state: Mutex<DispatcherState>,
    tick: Mutex<Option<JoinHandle<()>>>,
}

/// Routes triggers to agents and runs their tasks under a concurrency cap
#[derive(Clone)]
pub struct AgentDispatcher {
    inner: Arc<DispatcherInner>,
}

impl AgentDispatcher {
    pub fn new(user_id: &str, settings: DispatcherSettings) -> Self {
        let history_size = settings.history_size;
        Self {
            inner: Arc::new(DispatcherInner {
                settings,
                user_id: user_id.to_string(),
                agents: DashMap::new(),
                statuses: DashMap::new(),
                queue: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    active: HashSet::new(),
                }),
                history: Mutex::new(ExecutionHistory::new(history_size)),
                triggers: TriggerManager::new(),
                state: Mutex::new(DispatcherState::Idle),
                tick: Mutex::new(None),
            }),
        }
    }

    /// The trigger manager, for event emission and evaluator registration
    pub fn triggers(&self) -> &TriggerManager {
        &self.inner.triggers
    }

    /// Register an agent and its declared triggers
    ///
    /// Duplicate ids are refused with a warning. When the dispatcher is
    /// already running the agent is initialized in the background.
    pub fn register_agent(&self, agent: Arc<AgentInstance>) {
        let id = agent.id().to_string();
        if self.inner.agents.contains_key(&id) {
            warn!(agent_id = %id, "agent already registered, ignoring");
            return;
        }

        for trigger in agent.triggers() {
            self.inner.triggers.register_trigger(&id, trigger);
        }
        self.inner.statuses.insert(id.clone(), AgentStatus::default());
        self.inner.agents.insert(id.clone(), Arc::clone(&agent));
        info!(agent_id = %id, "agent registered");

        if self.state() != DispatcherState::Idle {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                if let Err(e) = agent.initialize().await {
                    error!(agent_id = %id, error = %e, "late agent initialization failed");
                    if let Some(mut status) = inner.statuses.get_mut(&id) {
                        status.init_failed = true;
                        status.last_error = Some(e.to_string());
                    }
                }
            });
        }
    }

    /// Remove an agent, its triggers, and its status entry
    pub async fn unregister_agent(&self, agent_id: &str) -> bool {
        self.inner.triggers.unregister_agent_triggers(agent_id);
        self.inner.statuses.remove(agent_id);

        match self.inner.agents.remove(agent_id) {
            Some((_, agent)) => {
                if let Err(e) = agent.cleanup().await {
                    warn!(agent_id, error = %e, "agent cleanup failed during unregister");
                }
                true
            }
            None => false,
        }
    }

    pub fn agent(&self, agent_id: &str) -> Option<Arc<AgentInstance>> {
        self.inner.agents.get(agent_id).map(|a| Arc::clone(&a))
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.inner.agents.iter().map(|e| e.key().clone()).collect()
    }

    pub fn agent_status(&self, agent_id: &str) -> Option<AgentStatus> {
        self.inner.statuses.get(agent_id).map(|s| s.value().clone())
    }

    pub fn state(&self) -> DispatcherState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initialize all agents, arm triggers, and start the queue tick
    ///
    /// Initialization failures are isolated per agent: a failing agent is
    /// marked and skipped, the rest proceed.
    pub async fn start(&self) {
        {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != DispatcherState::Idle {
                warn!("dispatcher already started");
                return;
            }
            *state = DispatcherState::Running;
        }

        let agents: Vec<Arc<AgentInstance>> = self
            .inner
            .agents
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        for agent in agents {
            if let Err(e) = agent.initialize().await {
                error!(agent_id = %agent.id(), error = %e, "agent initialization failed");
                if let Some(mut status) = self.inner.statuses.get_mut(agent.id()) {
                    status.init_failed = true;
                    status.last_error = Some(e.to_string());
                }
            }
        }

        let weak = Arc::downgrade(&self.inner);
        let callback: TriggerCallback = Arc::new(move |fire| {
            if let Some(inner) = weak.upgrade() {
                enqueue_fire(&inner, fire);
            }
        });
        self.inner.triggers.start(callback);

        self.spawn_tick();
        info!("dispatcher started");
    }

    /// Stop the tick, disarm triggers, drop queued tasks, clean up agents
    ///
    /// Tasks already running are left to finish; only pending ones are
    /// cancelled.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == DispatcherState::Idle {
                return;
            }
            *state = DispatcherState::Idle;
        }

        self.abort_tick();
        self.inner.triggers.stop();

        let dropped = {
            let mut qs = self.inner.queue.lock().unwrap_or_else(|e| e.into_inner());
            let n = qs.queue.len();
            for task in qs.queue.iter_mut() {
                task.status = TaskStatus::Cancelled;
            }
            qs.queue.clear();
            n
        };
        if dropped > 0 {
            info!(dropped, "cancelled queued tasks on stop");
        }

        let agents: Vec<Arc<AgentInstance>> = self
            .inner
            .agents
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        for agent in agents {
            if let Err(e) = agent.cleanup().await {
                warn!(agent_id = %agent.id(), error = %e, "agent cleanup failed");
            }
        }
        info!("dispatcher stopped");
    }

    /// Suspend queue processing; triggers keep enqueueing
    pub fn pause(&self) {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != DispatcherState::Running {
            return;
        }
        *state = DispatcherState::Paused;
        drop(state);

        self.abort_tick();
        info!("dispatcher paused");
    }

    /// Resume queue processing after a pause
    pub fn resume(&self) {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != DispatcherState::Paused {
            return;
        }
        *state = DispatcherState::Running;
        drop(state);

        self.spawn_tick();
        info!("dispatcher resumed");
    }

    /// Queue a task for an agent
    ///
    /// The task inherits the agent's metadata priority and is inserted in
    /// priority order (FIFO among equals). When the queue is full the
    /// oldest entry at the head is evicted first.
    pub fn enqueue_task(&self, agent_id: &str, context: AgentContext) -> Result<String> {
        let priority = match self.inner.agents.get(agent_id) {
            Some(agent) => agent.metadata().priority,
            None => return Err(DispatchError::AgentNotFound(agent_id.to_string())),
        };

        let task = AgentTask::new(agent_id, priority, context);
        let id = task.id.clone();
        push_task(&self.inner, task, false);
        Ok(id)
    }

    /// Score user-message triggers and execute the best match inline
    ///
    /// Bypasses the queue entirely so conversational replies are not
    /// delayed behind background work. Returns `None` when nothing matched.
    pub async fn dispatch_user_message(
        &self,
        message: &str,
        seed: ContextSeed,
    ) -> Option<AgentResult> {
        let matches = self.inner.triggers.match_user_message(message);
        let TriggerMatch {
            agent_id,
            trigger_id,
            score,
        } = matches.into_iter().next()?;

        debug!(agent_id = %agent_id, trigger_id = %trigger_id, score, "user message matched");
        self.inner.triggers.mark_fired(&agent_id, &trigger_id);

        let context = build_context(
            &self.inner.user_id,
            TriggerSource::UserMessage,
            ContextSeed {
                user_message: Some(message.to_string()),
                trigger_id: Some(trigger_id),
                ..seed
            },
        );

        Some(self.execute_now(&agent_id, context).await)
    }

    /// Execute an agent immediately, outside the queue
    pub async fn execute_agent_by_id(
        &self,
        agent_id: &str,
        source: TriggerSource,
        seed: ContextSeed,
    ) -> Result<AgentResult> {
        if !self.inner.agents.contains_key(agent_id) {
            return Err(DispatchError::AgentNotFound(agent_id.to_string()));
        }
        let context = build_context(&self.inner.user_id, source, seed);
        Ok(self.execute_now(agent_id, context).await)
    }

    pub fn get_stats(&self) -> DispatcherStats {
        let (queued, active) = {
            let qs = self.inner.queue.lock().unwrap_or_else(|e| e.into_inner());
            (qs.queue.len(), qs.active.len())
        };
        let history = self.inner.history.lock().unwrap_or_else(|e| e.into_inner());
        let total = history.len();
        let success = history.success_count();

        DispatcherStats {
            agents: self.inner.agents.len(),
            queued,
            active,
            total_executions: total,
            success_count: success,
            failure_count: total - success,
            success_rate: history.success_rate(),
        }
    }

    /// Most recent execution records, newest first
    pub fn get_history(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .recent(limit)
    }

    /// Snapshot of pending tasks in queue order
    pub fn queued_tasks(&self) -> Vec<AgentTask> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queue
            .iter()
            .cloned()
            .collect()
    }

    async fn execute_now(&self, agent_id: &str, context: AgentContext) -> AgentResult {
        let started_at = chrono::Utc::now();
        let result = run_agent(&self.inner, agent_id, &context).await;
        record_execution(
            &self.inner,
            &format!("direct-{}", uuid::Uuid::new_v4()),
            agent_id,
            context.trigger_source,
            started_at,
            0,
            &result,
        );
        result
    }

    fn spawn_tick(&self) {
        let weak = Arc::downgrade(&self.inner);
        let tick = Duration::from_millis(self.inner.settings.tick_ms.max(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                process_queue(&inner);
            }
        });

        let mut slot = self.inner.tick.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    fn abort_tick(&self) {
        let mut slot = self.inner.tick.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

fn enqueue_fire(inner: &Arc<DispatcherInner>, fire: TriggerFire) {
    if !inner.agents.contains_key(&fire.agent_id) {
        warn!(agent_id = %fire.agent_id, "trigger fired for unknown agent");
        return;
    }
    let priority = inner
        .agents
        .get(&fire.agent_id)
        .map(|a| a.metadata().priority)
        .unwrap_or_default();

    let context = build_context(
        &inner.user_id,
        fire.source,
        ContextSeed {
            trigger_id: Some(fire.trigger_id),
            metadata: fire.payload,
            ..ContextSeed::default()
        },
    );

    push_task(inner, AgentTask::new(&fire.agent_id, priority, context), false);
}

/// Insert a task. `front` forces head insertion for retries; otherwise the
/// task goes after every task of equal or more urgent priority.
fn push_task(inner: &Arc<DispatcherInner>, task: AgentTask, front: bool) {
    let mut qs = inner.queue.lock().unwrap_or_else(|e| e.into_inner());

    if !front && qs.queue.len() >= inner.settings.queue_size {
        if let Some(evicted) = qs.queue.pop_front() {
            warn!(
                task_id = %evicted.id,
                agent_id = %evicted.agent_id,
                "queue full, evicting oldest task"
            );
        }
    }

    if front {
        qs.queue.push_front(task);
    } else {
        let pos = qs
            .queue
            .iter()
            .position(|t| t.priority > task.priority)
            .unwrap_or(qs.queue.len());
        qs.queue.insert(pos, task);
    }
}

/// One tick pops at most one task off the queue head.
fn process_queue(inner: &Arc<DispatcherInner>) {
    let task = {
        let mut qs = inner.queue.lock().unwrap_or_else(|e| e.into_inner());
        if qs.active.len() >= inner.settings.max_concurrency {
            return;
        }
        let Some(mut task) = qs.queue.pop_front() else {
            return;
        };
        task.status = TaskStatus::Running;
        task.started_at = Some(chrono::Utc::now());
        qs.active.insert(task.id.clone());
        task
    };

    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        run_task(inner, task).await;
    });
}

async fn run_task(inner: Arc<DispatcherInner>, mut task: AgentTask) {
    let result = run_agent(&inner, &task.agent_id, &task.context).await;

    task.completed_at = Some(chrono::Utc::now());
    task.result = Some(result.clone());

    {
        let mut qs = inner.queue.lock().unwrap_or_else(|e| e.into_inner());
        qs.active.remove(&task.id);
    }

    if result.success {
        task.status = TaskStatus::Completed;
        record_execution(
            &inner,
            &task.id,
            &task.agent_id,
            task.context.trigger_source,
            task.started_at.unwrap_or(task.created_at),
            task.retry_count,
            &result,
        );
        return;
    }

    if task.retry_count < inner.settings.max_retries {
        let delay = Duration::from_millis(inner.settings.retry_delay_ms);
        warn!(
            task_id = %task.id,
            agent_id = %task.agent_id,
            attempt = task.retry_count + 1,
            "task failed, retrying"
        );
        task.reset_for_retry();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            push_task(&inner, task, true);
        });
        return;
    }

    task.status = TaskStatus::Failed;
    error!(
        task_id = %task.id,
        agent_id = %task.agent_id,
        retries = task.retry_count,
        "task failed permanently"
    );
    record_execution(
        &inner,
        &task.id,
        &task.agent_id,
        task.context.trigger_source,
        task.started_at.unwrap_or(task.created_at),
        task.retry_count,
        &result,
    );
}

async fn run_agent(
    inner: &Arc<DispatcherInner>,
    agent_id: &str,
    context: &AgentContext,
) -> AgentResult {
    let Some(agent) = inner.agents.get(agent_id).map(|a| Arc::clone(&a)) else {
        return AgentResult::fail(format!("Agent not found: {}", agent_id));
    };

    if !agent.should_trigger(context).await {
        debug!(agent_id, "agent declined trigger, skipping");
        return AgentResult::ok("skipped");
    }

    let result = agent.execute(context).await;

    if let Some(mut status) = inner.statuses.get_mut(agent_id) {
        status.execution_count += 1;
        status.last_executed_at = Some(chrono::Utc::now());
        if !result.success {
            status.error_count += 1;
            status.last_error = result.error.clone();
        }
    }

    result
}

fn record_execution(
    inner: &Arc<DispatcherInner>,
    task_id: &str,
    agent_id: &str,
    source: TriggerSource,
    started_at: chrono::DateTime<chrono::Utc>,
    retry_count: u32,
    result: &AgentResult,
) {
    let completed_at = chrono::Utc::now();
    let agent_name = inner
        .agents
        .get(agent_id)
        .map(|a| a.metadata().name.clone())
        .unwrap_or_else(|| agent_id.to_string());

    let record = ExecutionRecord {
        id: task_id.to_string(),
        agent_id: agent_id.to_string(),
        agent_name,
        trigger_source: source,
        started_at,
        completed_at,
        success: result.success,
        duration_ms: result
            .duration_ms
            .unwrap_or_else(|| (completed_at - started_at).num_milliseconds().max(0) as u64),
        message: result.message.clone(),
        error: result.error.clone(),
        retry_count,
    };
    inner
        .history
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(record);
}
