//! Pet Model
//!
//! The model-client boundary of the agent core. The real completion
//! clients live in the application shell; this crate defines only the
//! contract the orchestration core requires (per-step streaming with tool
//! calls and cancellation) plus a scripted mock for tests.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::{ModelClient, ModelEvent, ModelStream};
pub use error::{ModelError, Result};
pub use mock::{MockModel, ScriptedStep};
pub use types::{ChatMessage, ModelRequest, Role, ToolCall};
