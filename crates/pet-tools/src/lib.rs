//! Pet Tools
//!
//! Uniform capability contract for the agent core. Built-in tools and
//! MCP-discovered tools are normalized to one [`Tool`] trait with a
//! closed-enum parameter schema and a thread-safe registry.

pub mod builtin;
pub mod error;
pub mod registry;
pub mod schema;
pub mod tool;

pub use error::{Result, ToolError};
pub use registry::{mcp_tool_name, ToolRegistry};
pub use schema::{ParamKind, ParamSpec, ToolSchema};
pub use tool::{Tool, ToolResult};
