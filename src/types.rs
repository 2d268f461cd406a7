//! Core types for the stackforge workflow model.
//!
//! This module defines the fundamental vocabulary of a stack: the closed set
//! of component types a workflow node can have, and the opaque identifier
//! types used for nodes and edges. These are the domain concepts that define
//! what a workflow *is*; the mutable aggregate lives in [`crate::workflow`]
//! and [`crate::store`].
//!
//! # Examples
//!
//! ```rust
//! use stackforge::types::ComponentType;
//!
//! let kind = ComponentType::LlmEngine;
//!
//! // Encode for persistence / the wire
//! assert_eq!(kind.encode(), "llm-engine");
//!
//! // Round-trip
//! assert_eq!(ComponentType::decode("llm-engine"), Some(ComponentType::LlmEngine));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a workflow node. Caller-generated, unique within a
/// workflow.
pub type NodeId = String;

/// Opaque identifier for a workflow edge. Unique within a workflow.
pub type EdgeId = String;

/// The type of a component within a workflow graph.
///
/// `ComponentType` is a closed set: adding a type means registering a
/// default-config factory in [`crate::catalog`] and a variant in
/// [`crate::config::ComponentConfig`]. The wire representation is the
/// kebab-case tag the execution backend expects (`"user-query"`,
/// `"knowledge-base"`, `"llm-engine"`, `"output"`).
///
/// # Examples
///
/// ```rust
/// use stackforge::types::ComponentType;
///
/// let all = ComponentType::ALL;
/// assert_eq!(all.len(), 4);
///
/// let json = serde_json::to_string(&ComponentType::UserQuery).unwrap();
/// assert_eq!(json, "\"user-query\"");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    /// Entry point carrying the user's question into the pipeline.
    UserQuery,

    /// Document store providing retrieval context.
    KnowledgeBase,

    /// Language-model engine that produces the answer.
    LlmEngine,

    /// Terminal component rendering the pipeline result.
    Output,
}

impl ComponentType {
    /// All component types in canonical palette order.
    ///
    /// This is the order the authoring palette presents them in and the
    /// order validation reports missing prerequisites in.
    pub const ALL: [ComponentType; 4] = [
        ComponentType::UserQuery,
        ComponentType::KnowledgeBase,
        ComponentType::LlmEngine,
        ComponentType::Output,
    ];

    /// Encode a component type into its persisted string form.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use stackforge::types::ComponentType;
    /// assert_eq!(ComponentType::KnowledgeBase.encode(), "knowledge-base");
    /// ```
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            ComponentType::UserQuery => "user-query",
            ComponentType::KnowledgeBase => "knowledge-base",
            ComponentType::LlmEngine => "llm-engine",
            ComponentType::Output => "output",
        }
    }

    /// Decode a persisted string form back into a component type.
    ///
    /// Returns `None` for unknown tags; the set is closed, so unknown tags
    /// are a data error rather than an extension point.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use stackforge::types::ComponentType;
    /// assert_eq!(ComponentType::decode("output"), Some(ComponentType::Output));
    /// assert_eq!(ComponentType::decode("web-search"), None);
    /// ```
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "user-query" => Some(ComponentType::UserQuery),
            "knowledge-base" => Some(ComponentType::KnowledgeBase),
            "llm-engine" => Some(ComponentType::LlmEngine),
            "output" => Some(ComponentType::Output),
            _ => None,
        }
    }

    /// Returns `true` for the [`UserQuery`](Self::UserQuery) entry component.
    #[must_use]
    pub fn is_user_query(&self) -> bool {
        matches!(self, Self::UserQuery)
    }

    /// Returns `true` for the [`Output`](Self::Output) terminal component.
    #[must_use]
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Output)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}
