//! Graph-based workflow execution
//!
//! A supervisor node plans tasks for worker nodes over a cyclic graph;
//! [`WorkflowExecutor`] drives the loop with pause, resume, cancel, and an
//! iteration budget. Model output is treated as unreliable: contract
//! violations degrade gracefully instead of failing runs.

pub mod error;
pub mod executor;
pub mod graph;
pub mod message;
pub mod state;
pub mod supervisor;
pub mod worker;

pub use error::{Result, WorkflowError};
pub use executor::{WorkflowEvent, WorkflowExecutor, WorkflowRunOptions};
pub use graph::{Edge, EdgeTarget, TerminalNode, WorkflowGraph, WorkflowGraphBuilder, WorkflowNode};
pub use message::{average_response_time_ms, message_counts, MessageCounts, WorkflowMessage};
pub use state::{StateUpdate, WorkflowState, WorkflowStatus, WorkflowTask, WorkflowTaskStatus};
pub use supervisor::{SupervisorNode, SUPERVISOR};
pub use worker::WorkerNode;
