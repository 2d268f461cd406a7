//! # Stackforge: Workflow Graphs for Visually Assembled AI Stacks
//!
//! Stackforge models the core of a visual AI-pipeline builder: a typed
//! directed graph of components (query input, knowledge base, LLM engine,
//! output), the rules for mutating and validating that graph, and its
//! compilation into a request an external execution backend can run.
//!
//! ## Core Concepts
//!
//! - **Components**: Typed nodes drawn from a closed catalog, each with a
//!   strongly typed configuration
//! - **Store**: The single writer of workflow state; all mutations are
//!   total and rejected ones leave state untouched
//! - **Validator**: A deliberately coarse structural check gating
//!   build/chat
//! - **Compiler**: A pure, deterministic serialization of the snapshot
//! - **Session**: An async controller sequencing save/build/chat against
//!   the backend and keeping the chat transcript coherent
//!
//! ## Quick Start
//!
//! ```
//! use stackforge::catalog::ComponentCatalog;
//! use stackforge::compiler::compile;
//! use stackforge::store::WorkflowStore;
//! use stackforge::types::ComponentType;
//! use stackforge::validator::validate;
//! use stackforge::workflow::{Edge, Position};
//!
//! let mut store = WorkflowStore::create("wf-1", "Chat With AI");
//! store
//!     .add_node(ComponentCatalog::instantiate(
//!         ComponentType::UserQuery,
//!         "q1",
//!         Position::new(0.0, 0.0),
//!     ))
//!     .unwrap();
//! store
//!     .add_node(ComponentCatalog::instantiate(
//!         ComponentType::Output,
//!         "o1",
//!         Position::new(400.0, 0.0),
//!     ))
//!     .unwrap();
//! store.add_edge(Edge::new("e1", "q1", "o1")).unwrap();
//!
//! let report = validate(store.workflow());
//! assert!(report.valid);
//!
//! let request = compile(store.workflow());
//! assert_eq!(request.nodes.len(), 2);
//! ```
//!
//! ## Driving a Session
//!
//! The [`session::SessionController`] wraps a store plus an
//! [`backend::ExecutionBackend`] implementation (the production one is
//! [`http::HttpBackend`]) and walks the save/build/chat lifecycle:
//!
//! ```no_run
//! use stackforge::http::HttpBackend;
//! use stackforge::session::SessionController;
//! use stackforge::store::WorkflowStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = WorkflowStore::create("wf-1", "Chat With AI");
//! let mut session = SessionController::new(HttpBackend::from_env(), store);
//!
//! session.load().await?;
//! session.build().await?;
//! session.send_message("What does the uploaded contract say?").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`types`] - Component types and id vocabulary
//! - [`config`] - Per-type configuration union, defaults, merge rules
//! - [`catalog`] - The closed component palette
//! - [`workflow`] - Node/edge/workflow aggregate
//! - [`store`] - Single-writer mutation operations and change events
//! - [`validator`] - Coarse structural validation
//! - [`compiler`] - Deterministic execution-request compilation
//! - [`backend`] - Execution-service contract and failure taxonomy
//! - [`http`] - Reqwest implementation of the contract
//! - [`session`] - Save/build/chat orchestration and the transcript
//! - [`message`] - Transcript entries

pub mod backend;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod http;
pub mod message;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod validator;
pub mod workflow;
