//! The workflow aggregate: nodes, edges, and their invariants.
//!
//! A [`Workflow`] is the single shared aggregate of the authoring session.
//! It is owned and mutated exclusively by the
//! [`WorkflowStore`](crate::store::WorkflowStore); everything else reads
//! snapshots. The invariant enforced here and in the store: every edge's
//! endpoints exist among the workflow's nodes, and removing a node cascades
//! to the edges touching it.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::ComponentConfig;
use crate::types::{ComponentType, EdgeId, NodeId};

/// Sub-port discriminators for components exposing more than one input.
pub mod handles {
    /// The LLM engine's question input.
    pub const QUERY: &str = "query";
    /// The LLM engine's retrieval-context input.
    pub const CONTEXT: &str = "context";
}

/// Canvas position of a node. Presentation only, no invariant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A typed unit in the workflow graph.
///
/// The component type is carried by the flattened [`ComponentConfig`] tag,
/// so a node's type and its configuration can never disagree.
///
/// # Examples
///
/// ```
/// use stackforge::workflow::{Node, Position};
/// use stackforge::types::ComponentType;
///
/// let node = Node::new("q1", ComponentType::UserQuery, Position::new(0.0, 0.0));
/// assert_eq!(node.component_type(), ComponentType::UserQuery);
///
/// let json = serde_json::to_value(&node).unwrap();
/// assert_eq!(json["type"], "user-query");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Caller-generated id, unique within a workflow.
    pub id: NodeId,
    /// Canvas position; carried through persistence, never validated.
    pub position: Position,
    /// Display label.
    pub label: String,
    /// Typed configuration; its tag doubles as the node's `type` on the wire.
    #[serde(flatten)]
    pub config: ComponentConfig,
}

impl Node {
    /// Creates a node of the given type with its default configuration.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: ComponentType, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            label: default_label(kind).to_string(),
            config: ComponentConfig::default_for(kind),
        }
    }

    /// The component type of this node.
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        self.config.component_type()
    }
}

fn default_label(kind: ComponentType) -> &'static str {
    match kind {
        ComponentType::UserQuery => "User Query",
        ComponentType::KnowledgeBase => "Knowledge Base",
        ComponentType::LlmEngine => "LLM Engine",
        ComponentType::Output => "Output",
    }
}

/// A directed connection between two nodes' ports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique id within a workflow.
    pub id: EdgeId,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// Source sub-port, when the source exposes more than one output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Target sub-port, e.g. [`handles::QUERY`] or [`handles::CONTEXT`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Creates an edge between two nodes with no sub-port discriminators.
    #[must_use]
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Sets the target sub-port.
    #[must_use]
    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    /// Sets the source sub-port.
    #[must_use]
    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Whether this edge starts or ends at the given node.
    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The named, persisted graph of components a user authors.
///
/// Node and edge sets are keyed maps; iteration order is irrelevant to all
/// consumers (the compiler sorts before serializing).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: FxHashMap<NodeId, Node>,
    #[serde(default)]
    pub edges: FxHashMap<EdgeId, Edge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates an empty workflow stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Looks up an edge by id.
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Whether any node of the given component type exists.
    #[must_use]
    pub fn has_component(&self, kind: ComponentType) -> bool {
        self.nodes.values().any(|n| n.component_type() == kind)
    }

    /// Ids of all edges whose source or target is the given node.
    #[must_use]
    pub fn edges_touching(&self, node_id: &str) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.touches(node_id))
            .map(|e| e.id.clone())
            .collect();
        ids.sort();
        ids
    }
}
