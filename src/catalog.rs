//! Static registry of the component types a stack can be assembled from.
//!
//! The catalog is the authoring palette's data source: one entry per
//! [`ComponentType`] with a display label, a short description, and the
//! default-config factory. Adding a component type to the system means
//! adding it here and to [`ComponentConfig`](crate::config::ComponentConfig).

use crate::config::ComponentConfig;
use crate::types::ComponentType;
use crate::workflow::{Node, Position};

/// One palette entry: a component type plus its presentation strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: ComponentType,
    pub label: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    /// The default configuration for this entry's component type.
    #[must_use]
    pub fn default_config(&self) -> ComponentConfig {
        ComponentConfig::default_for(self.kind)
    }
}

/// The closed component catalog.
///
/// # Examples
///
/// ```
/// use stackforge::catalog::ComponentCatalog;
/// use stackforge::types::ComponentType;
///
/// let labels: Vec<_> = ComponentCatalog::entries().iter().map(|e| e.label).collect();
/// assert_eq!(labels, ["User Query", "Knowledge Base", "LLM Engine", "Output"]);
///
/// let entry = ComponentCatalog::entry(ComponentType::LlmEngine);
/// assert_eq!(entry.label, "LLM Engine");
/// ```
pub struct ComponentCatalog;

const ENTRIES: [CatalogEntry; 4] = [
    CatalogEntry {
        kind: ComponentType::UserQuery,
        label: "User Query",
        description: "Entry point for user questions",
    },
    CatalogEntry {
        kind: ComponentType::KnowledgeBase,
        label: "Knowledge Base",
        description: "Upload documents and retrieve relevant context",
    },
    CatalogEntry {
        kind: ComponentType::LlmEngine,
        label: "LLM Engine",
        description: "Generate answers with a language model",
    },
    CatalogEntry {
        kind: ComponentType::Output,
        label: "Output",
        description: "Render the pipeline result",
    },
];

impl ComponentCatalog {
    /// All entries in canonical palette order.
    #[must_use]
    pub fn entries() -> &'static [CatalogEntry] {
        &ENTRIES
    }

    /// The entry for a component type.
    #[must_use]
    pub fn entry(kind: ComponentType) -> &'static CatalogEntry {
        // ENTRIES covers every variant of the closed set.
        ENTRIES
            .iter()
            .find(|e| e.kind == kind)
            .expect("catalog covers all component types")
    }

    /// Instantiates a ready-to-insert node with catalog defaults.
    ///
    /// The caller supplies the id (drag-drop generates one per drop) and the
    /// drop position.
    #[must_use]
    pub fn instantiate(kind: ComponentType, id: impl Into<String>, position: Position) -> Node {
        let entry = Self::entry(kind);
        let mut node = Node::new(id, kind, position);
        node.label = entry.label.to_string();
        node
    }
}
