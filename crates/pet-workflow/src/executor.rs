//! Workflow run loop
//!
//! Drives a [`WorkflowGraph`] over one [`WorkflowState`]. The executor
//! exclusively owns its state for the run's duration; `get_state` hands
//! out copies only. Cancellation and pause are cooperative, observed once
//! per loop iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, WorkflowError};
use crate::graph::WorkflowGraph;
use crate::state::{WorkflowState, WorkflowStatus};

/// How often a paused run polls for resume
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Progress events emitted during a run
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    NodeStart { node: String, iteration: usize },
    NodeEnd { node: String },
    StatusChanged(WorkflowStatus),
    Error { message: String },
}

/// Per-run options
pub struct WorkflowRunOptions {
    /// Hard cap on node executions; the backstop against graph cycles
    pub max_iterations: usize,

    /// Optional progress sink
    pub events: Option<mpsc::UnboundedSender<WorkflowEvent>>,

    /// External cancellation
    pub cancel: CancellationToken,
}

impl WorkflowRunOptions {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Executes one workflow run at a time over a fixed graph
pub struct WorkflowExecutor {
    graph: Arc<WorkflowGraph>,
    state: Mutex<WorkflowState>,
    paused: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl WorkflowExecutor {
    pub fn new(graph: Arc<WorkflowGraph>) -> Self {
        Self {
            graph,
            state: Mutex::new(WorkflowState::new("", 0)),
            paused: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Copy of the current state
    pub fn get_state(&self) -> WorkflowState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Suspend the run loop at its next check
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.status == WorkflowStatus::Running {
            state.status = WorkflowStatus::Paused;
            info!("workflow paused");
        }
    }

    /// Resume a paused run
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.status == WorkflowStatus::Paused {
            state.status = WorkflowStatus::Running;
            info!("workflow resumed");
        }
    }

    /// Cancel the in-flight run at its next loop check
    pub fn cancel(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    }

    /// Run the graph from its entry point until an end node, a dead end,
    /// cancellation, or the iteration budget.
    ///
    /// Unknown nodes and node failures are fatal and return `Err`; an
    /// exhausted iteration budget is reported through the state's status
    /// instead.
    pub async fn run(&self, input: &str, options: WorkflowRunOptions) -> Result<WorkflowState> {
        let run_cancel = {
            let mut guard = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
            *guard = CancellationToken::new();
            guard.clone()
        };

        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            *state = WorkflowState::new(input, options.max_iterations);
            state.status = WorkflowStatus::Running;
            state.current_node = Some(self.graph.entry_point().to_string());
            state.started_at = Some(chrono::Utc::now());
        }
        self.emit(&options, WorkflowEvent::StatusChanged(WorkflowStatus::Running));
        info!(entry = self.graph.entry_point(), "workflow run started");

        loop {
            let Some(current) = self.get_state().current_node else {
                // dead end: ran out of path, keep whatever status was last set
                warn!("workflow ran out of edges");
                break;
            };

            {
                let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if state.iteration >= state.max_iterations {
                    drop(state);
                    self.finish_with_error("Max iterations reached", &options);
                    break;
                }
            }

            if run_cancel.is_cancelled() || options.cancel.is_cancelled() {
                self.set_status(WorkflowStatus::Cancelled, &options);
                break;
            }

            if self.paused.load(Ordering::SeqCst) {
                if run_cancel.is_cancelled() || options.cancel.is_cancelled() {
                    self.set_status(WorkflowStatus::Cancelled, &options);
                    break;
                }
                tokio::time::sleep(PAUSE_POLL).await;
                continue;
            }

            let Some(node) = self.graph.node(&current) else {
                // graph misconfiguration, fatal
                self.finish_with_error(&format!("Node not found: {}", current), &options);
                return Err(WorkflowError::NodeNotFound(current));
            };

            let iteration = self.get_state().iteration;
            debug!(node = %current, iteration, "executing node");
            self.emit(
                &options,
                WorkflowEvent::NodeStart {
                    node: current.clone(),
                    iteration,
                },
            );

            let snapshot = self.get_state();
            match node.execute(&snapshot).await {
                Ok(update) => {
                    let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                    state.apply(update);
                }
                Err(e) => {
                    error!(node = %current, error = %e, "node failed");
                    self.emit(
                        &options,
                        WorkflowEvent::Error {
                            message: e.to_string(),
                        },
                    );
                    self.finish_with_error(&e.to_string(), &options);
                    return Err(e);
                }
            }
            self.emit(
                &options,
                WorkflowEvent::NodeEnd {
                    node: current.clone(),
                },
            );

            let routed_to_end = {
                let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                state
                    .current_node
                    .as_deref()
                    .is_some_and(|n| self.graph.is_end_node(n))
            };
            if routed_to_end {
                {
                    let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                    state.iteration += 1;
                }
                self.set_status(WorkflowStatus::Completed, &options);
                break;
            }

            let next = {
                let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                self.graph.next_node(&current, &state)
            };
            {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                state.current_node = next;
                state.iteration += 1;
            }
        }

        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.ended_at = Some(chrono::Utc::now());
        }
        Ok(self.get_state())
    }

    fn set_status(&self, status: WorkflowStatus, options: &WorkflowRunOptions) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.status = status;
        }
        info!(?status, "workflow status changed");
        self.emit(options, WorkflowEvent::StatusChanged(status));
    }

    fn finish_with_error(&self, message: &str, options: &WorkflowRunOptions) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.status = WorkflowStatus::Error;
            state.error = Some(message.to_string());
        }
        self.emit(options, WorkflowEvent::StatusChanged(WorkflowStatus::Error));
    }

    fn emit(&self, options: &WorkflowRunOptions, event: WorkflowEvent) {
        if let Some(sender) = &options.events {
            let _ = sender.send(event);
        }
    }
}
