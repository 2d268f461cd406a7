use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stackforge::backend::{
    BackendError, BuildOutcome, ChatReply, ExecutionBackend, NewStack, SavedWorkflow, StackRecord,
    UploadReceipt,
};
use stackforge::compiler::ExecutionRequest;
use stackforge::config::{ComponentConfig, UploadStatus};
use stackforge::message::ChatMessage;
use stackforge::session::{
    BuildResult, ChatTurn, SessionController, SessionError, SessionInit, SessionPhase,
};
use stackforge::store::WorkflowStore;
use stackforge::types::ComponentType;
use stackforge::workflow::{Edge, Node, Position};

/// Programmable in-memory stand-in for the execution service.
///
/// Each failure slot holds `(status, detail)`; `None` means the call
/// succeeds with the canned payload.
#[derive(Default)]
struct MockBackend {
    calls: Arc<Mutex<Vec<String>>>,
    saved: Option<SavedWorkflow>,
    store_failure: Option<(u16, String)>,
    build_failure: Option<(u16, String)>,
    build_answer: Option<String>,
    chat_failure: Option<(u16, String)>,
    chat_response: Option<String>,
    upload_failure: Option<(u16, String)>,
    upload_id: String,
}

impl MockBackend {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let backend = Self {
            upload_id: "doc-1".to_string(),
            ..Self::default()
        };
        let calls = Arc::clone(&backend.calls);
        (backend, calls)
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn failure(slot: &Option<(u16, String)>) -> Option<BackendError> {
        slot.as_ref().map(|(code, detail)| BackendError::Status {
            code: *code,
            detail: detail.clone(),
        })
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    async fn list_stacks(&self) -> Result<Vec<StackRecord>, BackendError> {
        self.record("list_stacks");
        Ok(Vec::new())
    }

    async fn create_stack(&self, stack: &NewStack) -> Result<StackRecord, BackendError> {
        self.record("create_stack");
        Ok(StackRecord {
            id: "s1".to_string(),
            name: stack.name.clone(),
            description: stack.description.clone(),
            created_at: chrono::Utc::now(),
        })
    }

    async fn fetch_workflow(
        &self,
        _workflow_id: &str,
    ) -> Result<Option<SavedWorkflow>, BackendError> {
        self.record("fetch_workflow");
        Ok(self.saved.clone())
    }

    async fn store_workflow(
        &self,
        _workflow_id: &str,
        _request: &ExecutionRequest,
    ) -> Result<(), BackendError> {
        self.record("store_workflow");
        match Self::failure(&self.store_failure) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn upload_document(
        &self,
        _workflow_id: &str,
        _filename: &str,
        _bytes: Vec<u8>,
    ) -> Result<UploadReceipt, BackendError> {
        self.record("upload_document");
        match Self::failure(&self.upload_failure) {
            Some(err) => Err(err),
            None => Ok(UploadReceipt {
                document_id: self.upload_id.clone(),
            }),
        }
    }

    async fn build(
        &self,
        _workflow_id: &str,
        _request: &ExecutionRequest,
    ) -> Result<BuildOutcome, BackendError> {
        self.record("build");
        match Self::failure(&self.build_failure) {
            Some(err) => Err(err),
            None => Ok(BuildOutcome {
                answer: self.build_answer.clone(),
                extra: serde_json::Map::new(),
            }),
        }
    }

    async fn chat(&self, _workflow_id: &str, _message: &str) -> Result<ChatReply, BackendError> {
        self.record("chat");
        match Self::failure(&self.chat_failure) {
            Some(err) => Err(err),
            None => Ok(ChatReply {
                response: self.chat_response.clone(),
                message: None,
            }),
        }
    }
}

fn node(id: &str, kind: ComponentType) -> Node {
    Node::new(id, kind, Position::default())
}

fn buildable_store() -> WorkflowStore {
    let mut store = WorkflowStore::create("wf-1", "Chat With AI");
    store.add_node(node("q1", ComponentType::UserQuery)).unwrap();
    store.add_node(node("kb1", ComponentType::KnowledgeBase)).unwrap();
    store.add_node(node("llm1", ComponentType::LlmEngine)).unwrap();
    store.add_node(node("o1", ComponentType::Output)).unwrap();
    store.add_edge(Edge::new("e1", "q1", "llm1")).unwrap();
    store.add_edge(Edge::new("e2", "kb1", "llm1")).unwrap();
    store.add_edge(Edge::new("e3", "llm1", "o1")).unwrap();
    store
}

#[tokio::test]
async fn load_hydrates_the_store_from_a_saved_workflow() {
    let (mut backend, _calls) = MockBackend::new();
    backend.saved = Some(SavedWorkflow {
        nodes: vec![
            node("q1", ComponentType::UserQuery),
            node("o1", ComponentType::Output),
        ],
        edges: vec![Edge::new("e1", "q1", "o1")],
        data: serde_json::json!({}),
    });

    let mut session = SessionController::new(backend, WorkflowStore::create("wf-1", "restored"));
    let init = session.load().await.unwrap();
    assert_eq!(init, SessionInit::Restored { nodes: 2, edges: 1 });
    assert!(session.store().workflow().node("q1").is_some());
    assert!(session.store().workflow().edge("e1").is_some());
}

#[tokio::test]
async fn load_starts_fresh_when_nothing_was_saved() {
    let (backend, _calls) = MockBackend::new();
    let mut session = SessionController::new(backend, WorkflowStore::create("wf-1", "fresh"));
    assert_eq!(session.load().await.unwrap(), SessionInit::Fresh);
    assert!(session.store().workflow().nodes.is_empty());
}

#[tokio::test]
async fn build_is_gated_on_structural_validity() {
    let (backend, calls) = MockBackend::new();
    let mut session = SessionController::new(backend, WorkflowStore::create("wf-1", "empty"));

    let err = session.build().await.unwrap_err();
    let SessionError::Validation { report } = err else {
        panic!("expected a validation rejection");
    };
    assert_eq!(
        report.missing,
        vec![ComponentType::UserQuery, ComponentType::Output]
    );
    // Nothing was dispatched to the backend.
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn build_saves_then_builds_and_seeds_the_transcript() {
    let (mut backend, calls) = MockBackend::new();
    backend.build_answer = Some("Pipeline is up.".to_string());

    let mut session = SessionController::new(backend, buildable_store());
    assert_eq!(session.build().await.unwrap(), BuildResult::Ready);

    assert_eq!(session.phase(), SessionPhase::ChatReady);
    assert_eq!(*calls.lock().unwrap(), vec!["store_workflow", "build"]);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert!(transcript[0].has_role(ChatMessage::ASSISTANT));
    assert_eq!(transcript[0].content, "Pipeline is up.");
}

#[tokio::test]
async fn build_uses_the_documented_seed_fallback() {
    let (backend, _calls) = MockBackend::new();
    let mut session = SessionController::new(backend, buildable_store());
    session.build().await.unwrap();
    assert_eq!(
        session.transcript()[0].content,
        "Workflow executed successfully."
    );
}

#[tokio::test]
async fn failed_build_leaves_the_session_usable() {
    let (mut backend, _calls) = MockBackend::new();
    backend.build_failure = Some((500, "executor crashed".to_string()));

    let mut session = SessionController::new(backend, buildable_store());
    let result = session.build().await.unwrap();
    let BuildResult::Failed { detail } = result else {
        panic!("expected a failed build");
    };
    assert!(detail.contains("500"));

    // Exactly one synthetic assistant entry, and the phase allows a retry.
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert!(transcript[0].has_role(ChatMessage::ASSISTANT));
    assert!(transcript[0].content.starts_with("Error: failed to build workflow."));
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.phase().accepts_writes());
}

#[tokio::test]
async fn failed_save_during_build_is_reported_the_same_way() {
    let (mut backend, calls) = MockBackend::new();
    backend.store_failure = Some((503, "db unavailable".to_string()));

    let mut session = SessionController::new(backend, buildable_store());
    let BuildResult::Failed { .. } = session.build().await.unwrap() else {
        panic!("expected a failed build");
    };
    // Build was never dispatched after the save failed.
    assert_eq!(*calls.lock().unwrap(), vec!["store_workflow"]);
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn chat_requires_a_successful_build() {
    let (backend, _calls) = MockBackend::new();
    let mut session = SessionController::new(backend, buildable_store());
    assert!(matches!(
        session.send_message("hello").await,
        Err(SessionError::NotBuilt)
    ));
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn chat_appends_user_entry_then_assistant_reply() {
    let (mut backend, calls) = MockBackend::new();
    backend.build_answer = Some("Ready.".to_string());
    backend.chat_response = Some("Thirty days, per section 4.2.".to_string());

    let mut session = SessionController::new(backend, buildable_store());
    session.build().await.unwrap();

    let turn = session
        .send_message("What is the notice period?")
        .await
        .unwrap();
    assert_eq!(turn, ChatTurn::Replied);
    assert_eq!(session.phase(), SessionPhase::ChatReady);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 3);
    assert!(transcript[1].has_role(ChatMessage::USER));
    assert_eq!(transcript[1].content, "What is the notice period?");
    assert!(transcript[2].has_role(ChatMessage::ASSISTANT));
    assert_eq!(transcript[2].content, "Thirty days, per section 4.2.");

    // The workflow is persisted before each exchange.
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["store_workflow", "build", "store_workflow", "chat"]
    );
}

#[tokio::test]
async fn chat_reply_fallback_applies_when_the_body_is_empty() {
    let (mut backend, _calls) = MockBackend::new();
    backend.build_answer = Some("Ready.".to_string());

    let mut session = SessionController::new(backend, buildable_store());
    session.build().await.unwrap();
    session.send_message("anyone there?").await.unwrap();
    assert_eq!(
        session.transcript().last().unwrap().content,
        "No response from server."
    );
}

#[tokio::test]
async fn failed_chat_keeps_the_optimistic_user_entry() {
    let (mut backend, _calls) = MockBackend::new();
    backend.build_answer = Some("Ready.".to_string());
    backend.chat_failure = Some((500, "llm timeout".to_string()));

    let mut session = SessionController::new(backend, buildable_store());
    session.build().await.unwrap();

    let turn = session.send_message("hello").await.unwrap();
    assert!(matches!(turn, ChatTurn::Failed { .. }));

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 3);
    assert!(transcript[1].has_role(ChatMessage::USER));
    assert!(transcript[2].content.starts_with("Error:"));
    // The session recovers; the next exchange is allowed.
    assert_eq!(session.phase(), SessionPhase::ChatReady);
}

#[tokio::test]
async fn save_surfaces_backend_failures_but_keeps_local_state() {
    let (mut backend, _calls) = MockBackend::new();
    backend.store_failure = Some((500, "disk full".to_string()));

    let mut session = SessionController::new(backend, buildable_store());
    let before = session.store().snapshot();

    assert!(matches!(
        session.save().await,
        Err(SessionError::Backend(BackendError::Status { code: 500, .. }))
    ));
    assert_eq!(session.store().snapshot(), before);
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn autosave_is_best_effort_and_silent_on_failure() {
    let (mut backend, calls) = MockBackend::new();
    backend.store_failure = Some((500, "disk full".to_string()));

    let mut session = SessionController::new(backend, buildable_store());
    assert!(session.autosave_tick().await);
    assert_eq!(*calls.lock().unwrap(), vec!["store_workflow"]);
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn upload_records_the_receipt_on_the_knowledge_base_node() {
    let (mut backend, _calls) = MockBackend::new();
    backend.upload_id = "doc-42".to_string();

    let mut session = SessionController::new(backend, buildable_store());
    let receipt = session
        .upload_document("kb1", "contract.pdf", b"%PDF-1.7".to_vec())
        .await
        .unwrap();
    assert_eq!(receipt.document_id, "doc-42");

    let node = session.store().workflow().node("kb1").unwrap();
    let ComponentConfig::KnowledgeBase(kb) = &node.config else {
        panic!("kb1 is a knowledge base");
    };
    assert_eq!(kb.uploaded_files.len(), 1);
    assert_eq!(kb.uploaded_files[0].id, "doc-42");
    assert_eq!(kb.uploaded_files[0].filename, "contract.pdf");
    assert_eq!(kb.uploaded_files[0].status, UploadStatus::Uploaded);
}

#[tokio::test]
async fn failed_upload_is_recorded_with_error_status() {
    let (mut backend, _calls) = MockBackend::new();
    backend.upload_failure = Some((413, "file too large".to_string()));

    let mut session = SessionController::new(backend, buildable_store());
    let err = session
        .upload_document("kb1", "huge.pdf", vec![0u8; 16])
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Backend(_)));

    let node = session.store().workflow().node("kb1").unwrap();
    let ComponentConfig::KnowledgeBase(kb) = &node.config else {
        panic!("kb1 is a knowledge base");
    };
    assert_eq!(kb.uploaded_files.len(), 1);
    assert_eq!(kb.uploaded_files[0].status, UploadStatus::Error);
    assert!(kb.uploaded_files[0].id.is_empty());
}

#[tokio::test]
async fn upload_rejects_nodes_that_cannot_ingest_documents() {
    let (backend, calls) = MockBackend::new();
    let mut session = SessionController::new(backend, buildable_store());

    assert!(matches!(
        session.upload_document("llm1", "a.pdf", Vec::new()).await,
        Err(SessionError::NotKnowledgeBase { .. })
    ));
    assert!(matches!(
        session.upload_document("ghost", "a.pdf", Vec::new()).await,
        Err(SessionError::UnknownNode { .. })
    ));
    assert!(calls.lock().unwrap().is_empty());
}
