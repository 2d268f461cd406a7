//! Single-writer store for the active workflow.
//!
//! [`WorkflowStore`] owns the [`Workflow`] aggregate and is the only
//! component allowed to mutate it. All operations are total: a rejected
//! mutation returns a [`StoreError`] describing the logical outcome and
//! leaves the aggregate untouched; nothing here panics on normal input.
//!
//! Every accepted mutation bumps `updated_at` and a monotonic revision
//! counter. The revision is what the session layer captures before
//! dispatching a write, so a response that arrives after further local
//! edits can be recognized as stale and dropped.
//!
//! Consumers observe changes either by taking [`snapshot`](WorkflowStore::snapshot)s
//! or by subscribing to the change-event channel.

use miette::Diagnostic;
use thiserror::Error;

use crate::types::{EdgeId, NodeId};
use crate::workflow::{Edge, Node, Position, Workflow};

/// Change notification emitted after each accepted mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    NodeAdded {
        id: NodeId,
    },
    NodeUpdated {
        id: NodeId,
    },
    /// Node removal, with the ids of every edge the removal cascaded to.
    NodeRemoved {
        id: NodeId,
        cascaded_edges: Vec<EdgeId>,
    },
    EdgeAdded {
        id: EdgeId,
    },
    EdgeRemoved {
        id: EdgeId,
    },
    /// The whole aggregate was replaced (workflow loaded from persistence).
    Reloaded,
}

/// Logical outcomes for rejected store mutations.
///
/// These are reported results, not crashes; the store state is unchanged
/// whenever one is returned.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// A node with this id is already present.
    #[error("node id already present: {id}")]
    #[diagnostic(
        code(stackforge::store::duplicate_node),
        help("Generate a fresh id per dropped component.")
    )]
    DuplicateNode { id: NodeId },

    /// The referenced node does not exist.
    #[error("unknown node id: {id}")]
    #[diagnostic(code(stackforge::store::unknown_node))]
    UnknownNode { id: NodeId },

    /// An edge endpoint references a node that is not in the workflow.
    #[error("edge {edge} references unknown node: {node}")]
    #[diagnostic(
        code(stackforge::store::unknown_endpoint),
        help("Both source and target must be existing node ids.")
    )]
    UnknownEndpoint { edge: EdgeId, node: NodeId },

    /// An edge with this id is already present.
    #[error("edge id already present: {id}")]
    #[diagnostic(code(stackforge::store::duplicate_edge))]
    DuplicateEdge { id: EdgeId },

    /// Source and target are the same node.
    #[error("edge {id} is a self-loop")]
    #[diagnostic(
        code(stackforge::store::self_loop),
        help("A component cannot feed its own input.")
    )]
    SelfLoop { id: EdgeId },

    /// The referenced edge does not exist.
    #[error("unknown edge id: {id}")]
    #[diagnostic(code(stackforge::store::unknown_edge))]
    UnknownEdge { id: EdgeId },
}

/// Partial update applied to an existing node.
///
/// Unset fields are left alone; `config` is merged field-wise into the
/// node's typed configuration (see
/// [`ComponentConfig::merge`](crate::config::ComponentConfig::merge)).
#[derive(Clone, Debug, Default)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub position: Option<Position>,
    pub config: Option<serde_json::Value>,
}

impl NodeUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_config(mut self, partial: serde_json::Value) -> Self {
        self.config = Some(partial);
        self
    }
}

/// The single writer of workflow state.
///
/// # Examples
///
/// ```
/// use stackforge::store::WorkflowStore;
/// use stackforge::workflow::{Edge, Node, Position};
/// use stackforge::types::ComponentType;
///
/// let mut store = WorkflowStore::create("wf-1", "Chat With AI");
/// store.add_node(Node::new("q1", ComponentType::UserQuery, Position::default())).unwrap();
/// store.add_node(Node::new("o1", ComponentType::Output, Position::default())).unwrap();
/// store.add_edge(Edge::new("e1", "q1", "o1")).unwrap();
///
/// // Cascade: removing q1 also removes e1.
/// let cascaded = store.remove_node("q1").unwrap();
/// assert_eq!(cascaded, vec!["e1".to_string()]);
/// assert!(store.workflow().edges.is_empty());
/// ```
#[derive(Debug)]
pub struct WorkflowStore {
    workflow: Workflow,
    revision: u64,
    events: Option<flume::Sender<StoreEvent>>,
}

impl WorkflowStore {
    /// Wraps an existing workflow aggregate.
    #[must_use]
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            revision: 0,
            events: None,
        }
    }

    /// Creates a store around a fresh, empty workflow.
    #[must_use]
    pub fn create(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Workflow::new(id, name))
    }

    /// Subscribes to change events.
    ///
    /// Events are delivered losslessly over an unbounded channel; dropping
    /// the receiver silently detaches the subscription.
    pub fn subscribe(&mut self) -> flume::Receiver<StoreEvent> {
        let (tx, rx) = flume::unbounded();
        self.events = Some(tx);
        rx
    }

    /// Read access to the current aggregate.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Immutable snapshot of the current aggregate.
    #[must_use]
    pub fn snapshot(&self) -> Workflow {
        self.workflow.clone()
    }

    /// Monotonic mutation counter, bumped on every accepted mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Inserts a node. Rejects duplicate ids.
    pub fn add_node(&mut self, node: Node) -> Result<(), StoreError> {
        if self.workflow.nodes.contains_key(&node.id) {
            tracing::warn!(id = %node.id, "rejected add_node: duplicate id");
            return Err(StoreError::DuplicateNode { id: node.id });
        }
        let id = node.id.clone();
        tracing::debug!(%id, kind = %node.component_type(), "add_node");
        self.workflow.nodes.insert(id.clone(), node);
        self.touch();
        self.emit(StoreEvent::NodeAdded { id });
        Ok(())
    }

    /// Merges a partial update into an existing node.
    ///
    /// State is unchanged when the id is absent.
    pub fn update_node(&mut self, id: &str, update: &NodeUpdate) -> Result<(), StoreError> {
        let Some(node) = self.workflow.nodes.get_mut(id) else {
            tracing::warn!(%id, "rejected update_node: unknown id");
            return Err(StoreError::UnknownNode { id: id.to_string() });
        };
        if let Some(label) = &update.label {
            node.label = label.clone();
        }
        if let Some(position) = update.position {
            node.position = position;
        }
        if let Some(partial) = &update.config {
            node.config.merge(partial);
        }
        tracing::debug!(%id, "update_node");
        self.touch();
        self.emit(StoreEvent::NodeUpdated { id: id.to_string() });
        Ok(())
    }

    /// Removes a node and cascades removal of every edge touching it.
    ///
    /// Returns the cascaded edge ids in sorted order.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<EdgeId>, StoreError> {
        if !self.workflow.nodes.contains_key(id) {
            return Err(StoreError::UnknownNode { id: id.to_string() });
        }
        let cascaded = self.workflow.edges_touching(id);
        for edge_id in &cascaded {
            self.workflow.edges.remove(edge_id);
        }
        self.workflow.nodes.remove(id);
        tracing::debug!(%id, cascaded = cascaded.len(), "remove_node");
        self.touch();
        self.emit(StoreEvent::NodeRemoved {
            id: id.to_string(),
            cascaded_edges: cascaded.clone(),
        });
        Ok(cascaded)
    }

    /// Inserts an edge after checking both endpoints exist.
    ///
    /// Self-loops and duplicate edge ids are rejected; parallel edges
    /// between the same node pair are allowed when their ids differ
    /// (distinct sub-ports, e.g. the LLM engine's query and context inputs).
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), StoreError> {
        if self.workflow.edges.contains_key(&edge.id) {
            tracing::warn!(id = %edge.id, "rejected add_edge: duplicate id");
            return Err(StoreError::DuplicateEdge { id: edge.id });
        }
        if edge.source == edge.target {
            tracing::warn!(id = %edge.id, "rejected add_edge: self-loop");
            return Err(StoreError::SelfLoop { id: edge.id });
        }
        for endpoint in [&edge.source, &edge.target] {
            if !self.workflow.nodes.contains_key(endpoint) {
                tracing::warn!(id = %edge.id, node = %endpoint, "rejected add_edge: unknown endpoint");
                return Err(StoreError::UnknownEndpoint {
                    edge: edge.id,
                    node: endpoint.clone(),
                });
            }
        }
        let id = edge.id.clone();
        tracing::debug!(%id, source = %edge.source, target = %edge.target, "add_edge");
        self.workflow.edges.insert(id.clone(), edge);
        self.touch();
        self.emit(StoreEvent::EdgeAdded { id });
        Ok(())
    }

    /// Removes an edge. State is unchanged when the id is absent.
    pub fn remove_edge(&mut self, id: &str) -> Result<(), StoreError> {
        if self.workflow.edges.remove(id).is_none() {
            return Err(StoreError::UnknownEdge { id: id.to_string() });
        }
        tracing::debug!(%id, "remove_edge");
        self.touch();
        self.emit(StoreEvent::EdgeRemoved { id: id.to_string() });
        Ok(())
    }

    /// Replaces the whole aggregate (workflow loaded from persistence).
    ///
    /// Counts as a mutation: revision moves so pending writes against the
    /// previous state are recognized as stale.
    pub fn replace(&mut self, workflow: Workflow) {
        tracing::debug!(id = %workflow.id, "replace workflow aggregate");
        self.workflow = workflow;
        self.touch();
        self.emit(StoreEvent::Reloaded);
    }

    fn touch(&mut self) {
        self.workflow.updated_at = chrono::Utc::now();
        self.revision += 1;
    }

    fn emit(&mut self, event: StoreEvent) {
        if let Some(tx) = &self.events
            && tx.send(event).is_err()
        {
            // Receiver dropped; stop emitting.
            self.events = None;
        }
    }
}
