//! End-to-end dispatcher behavior: queueing, retries, concurrency, and
//! user-message routing.

use async_trait::async_trait;
use pet_agent::{
    AgentContext, AgentHandler, AgentInstance, AgentMetadata, AgentPriority, AgentResult,
    AgentTrigger, ContextSeed, Result as AgentResultT, TriggerKind, TriggerSource,
};
use pet_core::DispatcherSettings;
use pet_dispatch::{AgentDispatcher, DispatcherState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

struct ScriptedAgent {
    meta: AgentMetadata,
    triggers: Vec<AgentTrigger>,
    fail: bool,
    veto: bool,
    delay: Duration,
    executions: Arc<AtomicUsize>,
    attempt_times: Arc<Mutex<Vec<Instant>>>,
    last_context: Arc<Mutex<Option<AgentContext>>>,
}

impl ScriptedAgent {
    fn new(id: &str) -> Self {
        Self {
            meta: AgentMetadata::new(id, id, "test agent"),
            triggers: Vec::new(),
            fail: false,
            veto: false,
            delay: Duration::ZERO,
            executions: Arc::new(AtomicUsize::new(0)),
            attempt_times: Arc::new(Mutex::new(Vec::new())),
            last_context: Arc::new(Mutex::new(None)),
        }
    }

    fn priority(mut self, priority: AgentPriority) -> Self {
        self.meta.priority = priority;
        self
    }

    fn keywords(mut self, trigger_id: &str, keywords: Vec<&str>) -> Self {
        self.triggers.push(AgentTrigger::user_message(
            trigger_id,
            keywords.into_iter().map(String::from).collect(),
        ));
        self
    }

    fn default_trigger(mut self, trigger_id: &str) -> Self {
        self.triggers.push(AgentTrigger::new(
            trigger_id,
            TriggerKind::UserMessage {
                keywords: vec![],
                is_default: true,
            },
        ));
        self
    }

    fn always_fails(mut self) -> Self {
        self.fail = true;
        self
    }

    fn vetoes(mut self) -> Self {
        self.veto = true;
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn instance(self) -> Arc<AgentInstance> {
        Arc::new(AgentInstance::new(Arc::new(self)))
    }
}

#[async_trait]
impl AgentHandler for ScriptedAgent {
    fn metadata(&self) -> AgentMetadata {
        self.meta.clone()
    }

    fn triggers(&self) -> Vec<AgentTrigger> {
        self.triggers.clone()
    }

    async fn on_execute(
        &self,
        ctx: &AgentContext,
        _host: &AgentInstance,
    ) -> AgentResultT<AgentResult> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.attempt_times.lock().unwrap().push(Instant::now());
        *self.last_context.lock().unwrap() = Some(ctx.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            Ok(AgentResult::fail("scripted failure"))
        } else {
            Ok(AgentResult::ok(format!("{} done", self.meta.id)))
        }
    }

    async fn should_trigger(&self, _ctx: &AgentContext) -> bool {
        !self.veto
    }
}

fn fast_settings() -> DispatcherSettings {
    DispatcherSettings {
        queue_size: 50,
        max_concurrency: 3,
        max_retries: 3,
        retry_delay_ms: 50,
        tick_ms: 10,
        history_size: 1000,
    }
}

fn ctx(source: TriggerSource) -> AgentContext {
    pet_agent::build_context("user-1", source, ContextSeed::default())
}

#[tokio::test]
async fn priority_order_wins_over_enqueue_order() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    for (id, priority) in [
        ("low", AgentPriority::Low),
        ("critical", AgentPriority::Critical),
        ("normal", AgentPriority::Normal),
        ("high", AgentPriority::High),
    ] {
        dispatcher.register_agent(ScriptedAgent::new(id).priority(priority).instance());
    }

    for id in ["low", "critical", "normal", "high"] {
        dispatcher
            .enqueue_task(id, ctx(TriggerSource::Schedule))
            .unwrap();
    }

    let order: Vec<String> = dispatcher
        .queued_tasks()
        .into_iter()
        .map(|t| t.agent_id)
        .collect();
    assert_eq!(order, vec!["critical", "high", "normal", "low"]);
}

#[tokio::test]
async fn queue_bound_evicts_oldest() {
    let mut settings = fast_settings();
    settings.queue_size = 3;
    let dispatcher = AgentDispatcher::new("user-1", settings);
    dispatcher.register_agent(ScriptedAgent::new("worker").instance());

    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(
            dispatcher
                .enqueue_task("worker", ctx(TriggerSource::Schedule))
                .unwrap(),
        );
    }

    let queued = dispatcher.queued_tasks();
    assert_eq!(queued.len(), 3);
    // the first enqueued task was evicted
    assert!(queued.iter().all(|t| t.id != ids[0]));
}

#[tokio::test]
async fn enqueue_for_unknown_agent_fails() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    assert!(dispatcher
        .enqueue_task("ghost", ctx(TriggerSource::Schedule))
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn failing_task_retries_then_records_permanent_failure() {
    let mut settings = fast_settings();
    settings.max_retries = 2;
    let dispatcher = AgentDispatcher::new("user-1", settings);

    let agent = ScriptedAgent::new("flaky").always_fails();
    let executions = Arc::clone(&agent.executions);
    let attempts = Arc::clone(&agent.attempt_times);
    dispatcher.register_agent(agent.instance());

    dispatcher.start().await;
    dispatcher
        .enqueue_task("flaky", ctx(TriggerSource::Schedule))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    dispatcher.stop().await;

    // one initial attempt plus max_retries retries
    assert_eq!(executions.load(Ordering::SeqCst), 3);

    let times = attempts.lock().unwrap();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(50));
    }

    let history = dispatcher.get_history(10);
    assert_eq!(history.len(), 1);
    assert!(!history[0].success);
    assert_eq!(history[0].retry_count, 2);

    let status = dispatcher.agent_status("flaky").unwrap();
    assert_eq!(status.execution_count, 3);
    assert_eq!(status.error_count, 3);
}

#[tokio::test(start_paused = true)]
async fn concurrency_cap_limits_active_tasks() {
    let mut settings = fast_settings();
    settings.max_concurrency = 2;
    let dispatcher = AgentDispatcher::new("user-1", settings);
    dispatcher.register_agent(
        ScriptedAgent::new("slow")
            .slow(Duration::from_millis(100))
            .instance(),
    );

    dispatcher.start().await;
    for _ in 0..5 {
        dispatcher
            .enqueue_task("slow", ctx(TriggerSource::Schedule))
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stats = dispatcher.get_stats();
    assert_eq!(stats.active, 2);
    assert_eq!(stats.queued, 3);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let stats = dispatcher.get_stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.total_executions, 5);
    assert_eq!(stats.success_rate, 1.0);

    dispatcher.stop().await;
}

#[tokio::test(start_paused = true)]
async fn tick_admits_one_task_per_cycle() {
    let mut settings = fast_settings();
    settings.max_concurrency = 3;
    let dispatcher = AgentDispatcher::new("user-1", settings);
    dispatcher.register_agent(
        ScriptedAgent::new("slow")
            .slow(Duration::from_millis(100))
            .instance(),
    );

    dispatcher.start().await;
    // let the ticker settle onto its 10ms cadence before filling the queue
    tokio::time::sleep(Duration::from_millis(35)).await;
    for _ in 0..3 {
        dispatcher
            .enqueue_task("slow", ctx(TriggerSource::Schedule))
            .unwrap();
    }

    // each tick admits only the queue head, even with free slots
    tokio::time::sleep(Duration::from_millis(14)).await;
    let stats = dispatcher.get_stats();
    assert_eq!(stats.active, 1);
    assert_eq!(stats.queued, 2);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let stats = dispatcher.get_stats();
    assert_eq!(stats.active, 2);
    assert_eq!(stats.queued, 1);

    dispatcher.stop().await;
}

#[tokio::test]
async fn user_message_routes_to_best_keyword_match() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());

    let weather = ScriptedAgent::new("weather").keywords("kw", vec!["天气", "气温"]);
    let seen = Arc::clone(&weather.last_context);
    dispatcher.register_agent(weather.instance());
    dispatcher.register_agent(
        ScriptedAgent::new("chat")
            .default_trigger("fallback")
            .instance(),
    );

    let result = dispatcher
        .dispatch_user_message("今天天气怎么样", ContextSeed::default())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some("weather done"));

    let ctx = seen.lock().unwrap().clone().unwrap();
    assert_eq!(ctx.user_message.as_deref(), Some("今天天气怎么样"));
    assert_eq!(ctx.trigger_source, TriggerSource::UserMessage);
    assert_eq!(ctx.trigger_id.as_deref(), Some("kw"));
    assert_eq!(ctx.user_id, "user-1");

    assert_eq!(dispatcher.triggers().trigger_count("weather", "kw"), Some(1));
}

#[tokio::test]
async fn user_message_falls_back_to_default_agent() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    dispatcher.register_agent(
        ScriptedAgent::new("weather")
            .keywords("kw", vec!["天气"])
            .instance(),
    );
    dispatcher.register_agent(
        ScriptedAgent::new("chat")
            .default_trigger("fallback")
            .instance(),
    );

    let result = dispatcher
        .dispatch_user_message("给我讲个笑话", ContextSeed::default())
        .await
        .unwrap();
    assert_eq!(result.message.as_deref(), Some("chat done"));
}

#[tokio::test]
async fn unmatched_user_message_returns_none() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    dispatcher.register_agent(
        ScriptedAgent::new("weather")
            .keywords("kw", vec!["天气"])
            .instance(),
    );

    let result = dispatcher
        .dispatch_user_message("给我讲个笑话", ContextSeed::default())
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn veto_produces_skipped_success() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    let agent = ScriptedAgent::new("shy").vetoes();
    let executions = Arc::clone(&agent.executions);
    dispatcher.register_agent(agent.instance());

    let result = dispatcher
        .execute_agent_by_id("shy", TriggerSource::Event, ContextSeed::default())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some("skipped"));
    assert_eq!(executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stop_cancels_queued_tasks() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    dispatcher.register_agent(ScriptedAgent::new("worker").instance());

    dispatcher.start().await;
    dispatcher.pause();
    for _ in 0..3 {
        dispatcher
            .enqueue_task("worker", ctx(TriggerSource::Schedule))
            .unwrap();
    }
    assert_eq!(dispatcher.get_stats().queued, 3);

    dispatcher.stop().await;
    assert_eq!(dispatcher.get_stats().queued, 0);
    assert_eq!(dispatcher.state(), DispatcherState::Idle);
}

#[tokio::test]
async fn duplicate_registration_is_ignored() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    dispatcher.register_agent(ScriptedAgent::new("worker").instance());
    dispatcher.register_agent(ScriptedAgent::new("worker").instance());

    assert_eq!(dispatcher.agent_ids().len(), 1);
}

#[tokio::test]
async fn unregister_removes_triggers() {
    let dispatcher = AgentDispatcher::new("user-1", fast_settings());
    dispatcher.register_agent(
        ScriptedAgent::new("weather")
            .keywords("kw", vec!["天气"])
            .instance(),
    );

    assert!(dispatcher.unregister_agent("weather").await);
    assert!(dispatcher
        .dispatch_user_message("天气如何", ContextSeed::default())
        .await
        .is_none());
    assert!(!dispatcher.unregister_agent("weather").await);
}

#[tokio::test(start_paused = true)]
async fn interval_trigger_enqueues_and_executes() {
    let mut settings = fast_settings();
    settings.tick_ms = 10;
    let dispatcher = AgentDispatcher::new("user-1", settings);

    let mut agent = ScriptedAgent::new("ticker");
    agent.triggers.push(AgentTrigger::interval("beat", 1));
    let executions = Arc::clone(&agent.executions);
    let seen = Arc::clone(&agent.last_context);
    dispatcher.register_agent(agent.instance());

    dispatcher.start().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    dispatcher.stop().await;

    assert!(executions.load(Ordering::SeqCst) >= 1);
    let ctx = seen.lock().unwrap().clone().unwrap();
    assert_eq!(ctx.trigger_source, TriggerSource::Schedule);
    assert_eq!(ctx.trigger_id.as_deref(), Some("beat"));
}
