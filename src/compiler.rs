//! Compilation of a workflow snapshot into an execution request.
//!
//! This module intentionally does NOT perform I/O. [`compile`] is a pure
//! function of the snapshot it is given: the same snapshot always produces
//! a structurally identical [`ExecutionRequest`], because nodes and edges
//! are emitted sorted by id and the per-node configuration map is ordered.
//! The same request shape is used for persistence (save) and for triggering
//! execution (build), so the backend never sees two notions of "the
//! current workflow".
//!
//! Each node's configuration is embedded fully resolved. Defaults were
//! materialized when the node was instantiated, so the execution backend
//! never has to recompute them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::NodeId;
use crate::workflow::{Edge, Node, Workflow};

/// The canonical request shape consumed by the execution backend.
///
/// Serializes to the backend's `{nodes, edges, data}` envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Workflow nodes, sorted by id.
    pub nodes: Vec<Node>,
    /// Workflow edges, sorted by id.
    pub edges: Vec<Edge>,
    /// Fully resolved per-node configuration, keyed by node id.
    #[serde(rename = "data")]
    pub config: BTreeMap<NodeId, Value>,
}

/// Serializes the workflow snapshot into an [`ExecutionRequest`].
///
/// Pure and deterministic; no side effects.
///
/// # Examples
///
/// ```
/// use stackforge::compiler::compile;
/// use stackforge::workflow::{Edge, Node, Position, Workflow};
/// use stackforge::types::ComponentType;
///
/// let mut wf = Workflow::new("wf-1", "Chat With AI");
/// wf.nodes.insert("q1".into(), Node::new("q1", ComponentType::UserQuery, Position::default()));
/// wf.edges.insert("e1".into(), Edge::new("e1", "q1", "o1"));
///
/// let request = compile(&wf);
/// assert_eq!(request.nodes[0].id, "q1");
/// assert_eq!(request.config["q1"]["placeholder"], "Enter your question...");
/// ```
#[must_use]
pub fn compile(workflow: &Workflow) -> ExecutionRequest {
    let mut nodes: Vec<Node> = workflow.nodes.values().cloned().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<Edge> = workflow.edges.values().cloned().collect();
    edges.sort_by(|a, b| a.id.cmp(&b.id));

    let config: BTreeMap<NodeId, Value> = nodes
        .iter()
        .map(|node| (node.id.clone(), resolved_config(node)))
        .collect();

    tracing::debug!(
        workflow = %workflow.id,
        nodes = nodes.len(),
        edges = edges.len(),
        "compiled execution request"
    );

    ExecutionRequest {
        nodes,
        edges,
        config,
    }
}

fn resolved_config(node: &Node) -> Value {
    match serde_json::to_value(&node.config) {
        Ok(value) => value,
        // ComponentConfig has no fallible serialization path; this arm
        // exists so compile stays total.
        Err(err) => {
            tracing::error!(node = %node.id, %err, "configuration failed to serialize");
            Value::Null
        }
    }
}
