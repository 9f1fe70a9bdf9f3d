//! Workflow graph structure and builder

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, WorkflowError};
use crate::state::{StateUpdate, WorkflowState};

/// One executable node in the graph
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    /// Node id, unique within the graph
    fn id(&self) -> &str;

    /// Transform the current state into a partial update
    ///
    /// Nodes receive a read-only view; routing happens by setting
    /// `current_node` in the returned update or through graph edges.
    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate>;
}

/// A no-op node, used as a graph's terminal marker
///
/// Reaching it marks the run completed; its `execute` only runs when the
/// graph routes through it explicitly.
pub struct TerminalNode {
    id: String,
}

impl TerminalNode {
    pub fn new(id: &str) -> Arc<dyn WorkflowNode> {
        Arc::new(Self { id: id.to_string() })
    }
}

#[async_trait]
impl WorkflowNode for TerminalNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, _state: &WorkflowState) -> Result<StateUpdate> {
        Ok(StateUpdate::default())
    }
}

/// Where an edge leads
#[derive(Clone)]
pub enum EdgeTarget {
    /// Fixed destination node id
    Literal(String),

    /// Destination computed from the current state
    Dynamic(Arc<dyn Fn(&WorkflowState) -> String + Send + Sync>),
}

impl EdgeTarget {
    pub fn resolve(&self, state: &WorkflowState) -> String {
        match self {
            Self::Literal(id) => id.clone(),
            Self::Dynamic(f) => f(state),
        }
    }
}

/// A directed edge; the first satisfied edge out of a node wins
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: EdgeTarget,
    pub condition: Option<Arc<dyn Fn(&WorkflowState) -> bool + Send + Sync>>,
}

impl Edge {
    pub fn satisfied(&self, state: &WorkflowState) -> bool {
        match &self.condition {
            Some(condition) => condition(state),
            None => true,
        }
    }
}

/// Immutable graph of nodes and edges
pub struct WorkflowGraph {
    nodes: HashMap<String, Arc<dyn WorkflowNode>>,
    edges: Vec<Edge>,
    entry_point: String,
    end_nodes: Vec<String>,
}

impl std::fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("entry_point", &self.entry_point)
            .field("end_nodes", &self.end_nodes)
            .finish_non_exhaustive()
    }
}

impl WorkflowGraph {
    pub fn builder() -> WorkflowGraphBuilder {
        WorkflowGraphBuilder::default()
    }

    pub fn node(&self, id: &str) -> Option<Arc<dyn WorkflowNode>> {
        self.nodes.get(id).map(Arc::clone)
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn is_end_node(&self, id: &str) -> bool {
        self.end_nodes.iter().any(|n| n == id)
    }

    /// First satisfied outgoing edge's target, if any
    pub fn next_node(&self, from: &str, state: &WorkflowState) -> Option<String> {
        self.edges
            .iter()
            .filter(|e| e.from == from)
            .find(|e| e.satisfied(state))
            .map(|e| e.to.resolve(state))
    }
}

/// Validating builder; the graph is frozen once built
#[derive(Default)]
pub struct WorkflowGraphBuilder {
    nodes: HashMap<String, Arc<dyn WorkflowNode>>,
    edges: Vec<Edge>,
    entry_point: Option<String>,
    end_nodes: Vec<String>,
}

impl WorkflowGraphBuilder {
    pub fn add_node(mut self, node: Arc<dyn WorkflowNode>) -> Self {
        self.nodes.insert(node.id().to_string(), node);
        self
    }

    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push(Edge {
            from: from.to_string(),
            to: EdgeTarget::Literal(to.to_string()),
            condition: None,
        });
        self
    }

    pub fn add_conditional_edge<F>(mut self, from: &str, to: &str, condition: F) -> Self
    where
        F: Fn(&WorkflowState) -> bool + Send + Sync + 'static,
    {
        self.edges.push(Edge {
            from: from.to_string(),
            to: EdgeTarget::Literal(to.to_string()),
            condition: Some(Arc::new(condition)),
        });
        self
    }

    pub fn add_dynamic_edge<F>(mut self, from: &str, to: F) -> Self
    where
        F: Fn(&WorkflowState) -> String + Send + Sync + 'static,
    {
        self.edges.push(Edge {
            from: from.to_string(),
            to: EdgeTarget::Dynamic(Arc::new(to)),
            condition: None,
        });
        self
    }

    pub fn entry_point(mut self, node_id: &str) -> Self {
        self.entry_point = Some(node_id.to_string());
        self
    }

    pub fn end_node(mut self, node_id: &str) -> Self {
        self.end_nodes.push(node_id.to_string());
        self
    }

    /// Validate and freeze the graph
    pub fn build(self) -> Result<WorkflowGraph> {
        let entry_point = self
            .entry_point
            .ok_or_else(|| WorkflowError::MissingEntryPoint("<unset>".to_string()))?;
        if !self.nodes.contains_key(&entry_point) {
            return Err(WorkflowError::MissingEntryPoint(entry_point));
        }
        if self.end_nodes.is_empty() {
            return Err(WorkflowError::NoEndNodes);
        }
        for end in &self.end_nodes {
            if !self.nodes.contains_key(end) {
                return Err(WorkflowError::UnknownEndNode(end.clone()));
            }
        }

        Ok(WorkflowGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry_point,
            end_nodes: self.end_nodes,
        })
    }
}
