//! Session orchestration: save, build, and chat against the backend.
//!
//! A [`SessionController`] owns the [`WorkflowStore`] for one workflow and
//! drives the external execution service through the
//! [`ExecutionBackend`] seam. It is a small state machine:
//!
//! ```text
//! Idle      --save-->   Saving   --> Idle
//! Idle      --build-->  Building --> ChatReady (success)
//!                                 --> Idle      (failure, non-fatal)
//! ChatReady --send-->   Sending  --> ChatReady
//! ```
//!
//! Sequencing rules, per workflow id:
//! - Only one write (save, build, or chat-triggered save) may be in flight;
//!   a second request while one is outstanding is rejected with
//!   [`SessionError::Busy`], never dispatched concurrently.
//! - A response that arrives after further local edits is detected by
//!   comparing the store revision captured at dispatch time, and its
//!   payload is discarded instead of clobbering newer state.
//! - Build and chat failures append a synthetic assistant-role transcript
//!   entry and leave the session usable; they are not fatal.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::backend::{BackendError, ExecutionBackend, UploadReceipt};
use crate::compiler::compile;
use crate::config::{ComponentConfig, FileRef, UploadStatus};
use crate::message::ChatMessage;
use crate::store::{NodeUpdate, WorkflowStore};
use crate::validator::{ValidationReport, validate};
use crate::workflow::Workflow;

/// Environment variable naming the autosave cadence in seconds.
pub const AUTOSAVE_SECS_VAR: &str = "STACKFORGE_AUTOSAVE_SECS";

const DEFAULT_AUTOSAVE_SECS: u64 = 30;

/// Resolves the cadence for timer-driven
/// [`SessionController::autosave_tick`] loops from the environment
/// (`.env` honored). Zero and unparsable values fall back to the
/// default of 30 seconds.
#[must_use]
pub fn autosave_interval() -> Duration {
    dotenvy::dotenv().ok();
    let secs = std::env::var(AUTOSAVE_SECS_VAR)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&s| s > 0)
        .unwrap_or(DEFAULT_AUTOSAVE_SECS);
    Duration::from_secs(secs)
}

/// Where the controller currently is in its request lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No request in flight; the workflow has not been built yet.
    Idle,
    /// A save is outstanding.
    Saving,
    /// A build is outstanding.
    Building,
    /// The pipeline is built; chat is available.
    ChatReady,
    /// A chat exchange is outstanding.
    Sending,
}

impl SessionPhase {
    /// Whether a new write may be dispatched from this phase.
    #[must_use]
    pub fn accepts_writes(&self) -> bool {
        matches!(self, SessionPhase::Idle | SessionPhase::ChatReady)
    }
}

/// How a session came up after loading from persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionInit {
    /// No saved workflow existed; starting fresh.
    Fresh,
    /// A saved workflow was hydrated into the store.
    Restored { nodes: usize, edges: usize },
}

/// Outcome of a build attempt. Failure is a normal, recoverable state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildResult {
    /// The pipeline is instantiated; the transcript was seeded.
    Ready,
    /// The backend rejected or failed the build; a synthetic transcript
    /// entry was appended and the session stays usable.
    Failed { detail: String },
}

/// Outcome of one chat exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatTurn {
    /// The assistant reply was appended to the transcript.
    Replied,
    /// The exchange failed; a synthetic error entry was appended.
    Failed { detail: String },
}

/// Errors the controller reports to its caller.
///
/// Backend failures during build/chat are *not* here; those surface as
/// transcript entries per the non-fatal policy. `Backend` only wraps
/// failures of plain saves and uploads, where there is no transcript to
/// speak through.
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    /// A request of this kind is already outstanding.
    #[error("a {operation} request is already in flight")]
    #[diagnostic(
        code(stackforge::session::busy),
        help("Wait for the outstanding request to resolve, then retry.")
    )]
    Busy { operation: &'static str },

    /// Chat was attempted before a successful build.
    #[error("workflow has not been built; chat is unavailable")]
    #[diagnostic(code(stackforge::session::not_built))]
    NotBuilt,

    /// The coarse structural check failed; user-correctable.
    #[error("workflow is not executable: {} prerequisite(s) missing", report.missing.len())]
    #[diagnostic(
        code(stackforge::session::validation),
        help("Add the missing component types and connect the graph.")
    )]
    Validation { report: ValidationReport },

    /// The referenced node does not exist.
    #[error("unknown node id: {id}")]
    #[diagnostic(code(stackforge::session::unknown_node))]
    UnknownNode { id: String },

    /// Document upload targeted a node that is not a knowledge base.
    #[error("node {id} is not a knowledge base")]
    #[diagnostic(code(stackforge::session::not_knowledge_base))]
    NotKnowledgeBase { id: String },

    /// A save or upload failed at the backend.
    #[error(transparent)]
    #[diagnostic(code(stackforge::session::backend))]
    Backend(#[from] BackendError),
}

/// Per-workflow orchestrator for save/build/chat.
pub struct SessionController<B: ExecutionBackend> {
    backend: B,
    store: WorkflowStore,
    phase: SessionPhase,
    transcript: Vec<ChatMessage>,
}

impl<B: ExecutionBackend> SessionController<B> {
    /// Creates a controller over an existing store.
    #[must_use]
    pub fn new(backend: B, store: WorkflowStore) -> Self {
        Self {
            backend,
            store,
            phase: SessionPhase::Idle,
            transcript: Vec::new(),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The chat transcript so far, oldest first.
    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Read access to the store.
    #[must_use]
    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// Mutable access to the store for authoring edits.
    ///
    /// The store remains the single writer of workflow state; the
    /// controller itself never mutates nodes or edges.
    pub fn store_mut(&mut self) -> &mut WorkflowStore {
        &mut self.store
    }

    /// Loads the saved workflow for this id, if any, into the store.
    ///
    /// A 404 from the backend means "no saved workflow yet" and starts
    /// fresh. A response that lands after local edits were made is stale
    /// and is discarded.
    pub async fn load(&mut self) -> Result<SessionInit, SessionError> {
        let workflow_id = self.store.workflow().id.clone();
        let dispatched_at = self.store.revision();

        let Some(saved) = self.backend.fetch_workflow(&workflow_id).await? else {
            tracing::info!(%workflow_id, "starting fresh workflow");
            return Ok(SessionInit::Fresh);
        };

        if self.store.revision() != dispatched_at {
            tracing::warn!(%workflow_id, "discarding stale workflow load; local edits exist");
            return Ok(SessionInit::Fresh);
        }

        let current = self.store.workflow();
        let mut hydrated = Workflow::new(current.id.clone(), current.name.clone());
        hydrated.created_at = current.created_at;
        for node in saved.nodes {
            hydrated.nodes.insert(node.id.clone(), node);
        }
        for edge in saved.edges {
            hydrated.edges.insert(edge.id.clone(), edge);
        }
        let (nodes, edges) = (hydrated.nodes.len(), hydrated.edges.len());
        self.store.replace(hydrated);
        tracing::info!(%workflow_id, nodes, edges, "restored saved workflow");
        Ok(SessionInit::Restored { nodes, edges })
    }

    /// Validates the current snapshot.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        validate(self.store.workflow())
    }

    /// Compiles and persists the current snapshot.
    ///
    /// Rejected with [`SessionError::Busy`] while another write is in
    /// flight. A failed save is reported but leaves all local state in its
    /// last-known-good condition.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        if !self.phase.accepts_writes() {
            return Err(SessionError::Busy { operation: "save" });
        }
        let resume = self.phase;
        self.phase = SessionPhase::Saving;
        let result = self.persist_current().await;
        self.phase = resume;
        result.map_err(SessionError::Backend)
    }

    /// Timer-driven best-effort save.
    ///
    /// Behaves like [`save`](Self::save) but is silent on both success and
    /// failure, and simply skips the tick while another request is in
    /// flight. Returns whether a save was actually dispatched.
    pub async fn autosave_tick(&mut self) -> bool {
        if !self.phase.accepts_writes() {
            tracing::debug!("autosave skipped; request in flight");
            return false;
        }
        let resume = self.phase;
        self.phase = SessionPhase::Saving;
        if let Err(err) = self.persist_current().await {
            tracing::debug!(%err, "autosave failed (best effort)");
        }
        self.phase = resume;
        true
    }

    /// Compiles, persists, and asks the backend to instantiate the
    /// pipeline.
    ///
    /// On success the transcript is seeded with the service's initial
    /// answer and chat becomes available. On backend failure a synthetic
    /// assistant entry is appended and the session returns to a usable
    /// idle state.
    pub async fn build(&mut self) -> Result<BuildResult, SessionError> {
        if !self.phase.accepts_writes() {
            return Err(SessionError::Busy { operation: "build" });
        }
        let report = self.validate();
        if !report.valid {
            return Err(SessionError::Validation { report });
        }

        self.phase = SessionPhase::Building;
        let workflow_id = self.store.workflow().id.clone();
        let request = compile(self.store.workflow());

        let built = match self.backend.store_workflow(&workflow_id, &request).await {
            Ok(()) => self.backend.build(&workflow_id, &request).await,
            Err(err) => Err(err),
        };

        match built {
            Ok(outcome) => {
                self.transcript
                    .push(ChatMessage::assistant(outcome.answer_text()));
                self.phase = SessionPhase::ChatReady;
                tracing::info!(%workflow_id, "workflow built; chat ready");
                Ok(BuildResult::Ready)
            }
            Err(err) => {
                let detail = err.to_string();
                self.transcript.push(ChatMessage::assistant(&format!(
                    "Error: failed to build workflow. {detail}"
                )));
                self.phase = SessionPhase::Idle;
                tracing::warn!(%workflow_id, %detail, "build failed; session stays usable");
                Ok(BuildResult::Failed { detail })
            }
        }
    }

    /// Sends one chat message through the built pipeline.
    ///
    /// The user entry is appended optimistically before any network
    /// activity; the current workflow is saved first so backend context
    /// matches what the user sees. Only one exchange may be outstanding.
    pub async fn send_message(&mut self, text: &str) -> Result<ChatTurn, SessionError> {
        match self.phase {
            SessionPhase::Sending => return Err(SessionError::Busy { operation: "chat" }),
            SessionPhase::ChatReady => {}
            _ => return Err(SessionError::NotBuilt),
        }

        self.phase = SessionPhase::Sending;
        self.transcript.push(ChatMessage::user(text));
        let workflow_id = self.store.workflow().id.clone();

        let replied = match self.persist_current().await {
            Ok(()) => self.backend.chat(&workflow_id, text).await,
            Err(err) => Err(err),
        };

        let turn = match replied {
            Ok(reply) => {
                self.transcript.push(ChatMessage::assistant(reply.text()));
                ChatTurn::Replied
            }
            Err(err) => {
                let detail = err.to_string();
                self.transcript
                    .push(ChatMessage::assistant(&format!("Error: {detail}")));
                tracing::warn!(%workflow_id, %detail, "chat exchange failed");
                ChatTurn::Failed { detail }
            }
        };
        self.phase = SessionPhase::ChatReady;
        Ok(turn)
    }

    /// Uploads a document for a knowledge-base node and records the
    /// resulting [`FileRef`] in that node's configuration.
    pub async fn upload_document(
        &mut self,
        node_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, SessionError> {
        let files = {
            let node = self.store.workflow().node(node_id).ok_or_else(|| {
                SessionError::UnknownNode {
                    id: node_id.to_string(),
                }
            })?;
            match &node.config {
                ComponentConfig::KnowledgeBase(kb) => kb.uploaded_files.clone(),
                _ => {
                    return Err(SessionError::NotKnowledgeBase {
                        id: node_id.to_string(),
                    });
                }
            }
        };

        let workflow_id = self.store.workflow().id.clone();
        let outcome = self
            .backend
            .upload_document(&workflow_id, filename, bytes)
            .await;

        let (entry, receipt) = match outcome {
            Ok(receipt) => (
                FileRef {
                    id: receipt.document_id.clone(),
                    filename: filename.to_string(),
                    status: UploadStatus::Uploaded,
                },
                Ok(receipt),
            ),
            Err(err) => (
                FileRef {
                    id: String::new(),
                    filename: filename.to_string(),
                    status: UploadStatus::Error,
                },
                Err(err),
            ),
        };

        let mut files = files;
        files.push(entry);
        let update = NodeUpdate::new().with_config(serde_json::json!({
            "uploadedFiles": files,
        }));
        // The node existed above; a concurrent removal is impossible in
        // this single-writer model.
        if let Err(err) = self.store.update_node(node_id, &update) {
            tracing::warn!(%err, "failed to record upload on node");
        }
        receipt.map_err(SessionError::Backend)
    }

    async fn persist_current(&mut self) -> Result<(), BackendError> {
        let workflow_id = self.store.workflow().id.clone();
        let dispatched_at = self.store.revision();
        let request = compile(self.store.workflow());
        let result = self.backend.store_workflow(&workflow_id, &request).await;
        if self.store.revision() != dispatched_at {
            // The ack carries no payload to apply; note the supersession.
            tracing::debug!(%workflow_id, "workflow edited while save was in flight");
        }
        result
    }
}
