//! Coarse structural validation of a workflow.
//!
//! `valid` here means exactly: at least one user-query node, at least one
//! output node, and a non-empty edge set. It does not verify reachability
//! from query to output, type compatibility across an edge, or per-node
//! configuration completeness; an edge between two output nodes satisfies
//! the connection check. That scope is deliberate and preserved from the
//! system this models. Deeper checks exist only as advisory
//! [`config_issues`] that never gate an action.

use serde::{Deserialize, Serialize};

use crate::config::ConfigIssue;
use crate::types::{ComponentType, NodeId};
use crate::workflow::Workflow;

/// Result of the coarse structural check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the workflow is executable by this system's definition.
    pub valid: bool,
    /// Required component types with no node present, in canonical
    /// palette order.
    pub missing: Vec<ComponentType>,
    /// Whether the edge set is non-empty.
    pub has_connections: bool,
}

/// Advisory configuration finding attached to a specific node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeConfigIssue {
    pub node_id: NodeId,
    pub issue: ConfigIssue,
}

/// Runs the coarse structural check.
///
/// Deterministic and order-independent over the node and edge sets.
///
/// # Examples
///
/// ```
/// use stackforge::validator::validate;
/// use stackforge::workflow::Workflow;
/// use stackforge::types::ComponentType;
///
/// let report = validate(&Workflow::new("wf-1", "empty"));
/// assert!(!report.valid);
/// assert_eq!(report.missing, vec![ComponentType::UserQuery, ComponentType::Output]);
/// assert!(!report.has_connections);
/// ```
#[must_use]
pub fn validate(workflow: &Workflow) -> ValidationReport {
    let has_user_query = workflow.has_component(ComponentType::UserQuery);
    let has_output = workflow.has_component(ComponentType::Output);
    let has_connections = !workflow.edges.is_empty();

    let mut missing = Vec::new();
    if !has_user_query {
        missing.push(ComponentType::UserQuery);
    }
    if !has_output {
        missing.push(ComponentType::Output);
    }

    let report = ValidationReport {
        valid: has_user_query && has_output && has_connections,
        missing,
        has_connections,
    };
    tracing::debug!(
        valid = report.valid,
        missing = report.missing.len(),
        has_connections,
        "validated workflow"
    );
    report
}

/// Aggregates per-node configuration findings, sorted by node id.
///
/// Purely advisory; an empty result is not implied by
/// [`validate`] returning `valid`.
#[must_use]
pub fn config_issues(workflow: &Workflow) -> Vec<NodeConfigIssue> {
    let mut issues: Vec<NodeConfigIssue> = workflow
        .nodes
        .values()
        .flat_map(|node| {
            node.config.validate().into_iter().map(|issue| NodeConfigIssue {
                node_id: node.id.clone(),
                issue,
            })
        })
        .collect();
    issues.sort_by(|a, b| (&a.node_id, a.issue.field).cmp(&(&b.node_id, b.issue.field)));
    issues
}
