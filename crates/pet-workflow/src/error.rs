use thiserror::Error;

/// Errors produced by graph construction and workflow execution
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Entry point '{0}' is not a registered node")]
    MissingEntryPoint(String),

    #[error("Graph declares no end nodes")]
    NoEndNodes,

    #[error("End node '{0}' is not a registered node")]
    UnknownEndNode(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node '{node}' failed: {message}")]
    NodeFailed { node: String, message: String },

    #[error("Model error: {0}")]
    Model(#[from] pet_model::ModelError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] pet_runtime::RuntimeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
