//! The seam to the external execution service.
//!
//! The execution backend is a black box reachable over HTTP: it persists
//! workflows, ingests documents, instantiates ("builds") pipelines, and
//! answers chat messages. This module defines the [`ExecutionBackend`]
//! trait the session controller drives, the wire record types, and the
//! failure taxonomy. The production implementation lives in
//! [`crate::http`]; tests substitute in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::compiler::ExecutionRequest;
use crate::workflow::{Edge, Node};

/// A stack as listed by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStack {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A previously saved workflow as returned by the backend.
///
/// Mirrors the persisted `{nodes, edges, data}` envelope; `data` is carried
/// opaquely since the typed node configs already embed everything the
/// client needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedWorkflow {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub data: Value,
}

/// Identifier for a document the backend has ingested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    pub document_id: String,
}

impl UploadReceipt {
    /// Extracts the document id from an upload response body.
    ///
    /// The backend is inconsistent about the field name; `id`,
    /// `document_id`, and `uid` are all observed in the wild.
    #[must_use]
    pub fn from_response(body: &Value) -> Option<Self> {
        ["id", "document_id", "uid"]
            .iter()
            .find_map(|key| body.get(*key))
            .and_then(Value::as_str)
            .map(|id| Self {
                document_id: id.to_string(),
            })
    }
}

/// Response to a build request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildOutcome {
    /// The service's initial answer, used to seed the transcript.
    #[serde(default)]
    pub answer: Option<String>,
    /// Implementation-defined extra fields, carried opaquely.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl BuildOutcome {
    /// Transcript seed text, with the documented fallback.
    #[must_use]
    pub fn answer_text(&self) -> &str {
        self.answer
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Workflow executed successfully.")
    }
}

/// Response to a chat request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    /// Fallback field some backend versions use instead of `response`.
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatReply {
    /// Reply text following the `response` then `message` fallback chain.
    #[must_use]
    pub fn text(&self) -> &str {
        self.response
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("No response from server.")
    }
}

/// Failure taxonomy for backend interactions.
///
/// `NotFound` for a saved workflow is not represented here: the trait
/// returns `Ok(None)` for that case, because "no saved workflow yet" is a
/// normal state, not an error.
#[derive(Debug, Error, Diagnostic)]
pub enum BackendError {
    /// The request never produced an HTTP response.
    #[error("transport failure: {message}")]
    #[diagnostic(
        code(stackforge::backend::transport),
        help("Check network connectivity and the configured server URL.")
    )]
    Transport { message: String },

    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {code}: {detail}")]
    #[diagnostic(code(stackforge::backend::status))]
    Status { code: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode backend response: {0}")]
    #[diagnostic(code(stackforge::backend::decode))]
    Decode(#[from] serde_json::Error),
}

/// Async contract with the execution service.
///
/// All methods are request/response; none of them mutate client-side
/// workflow state. The session controller owns sequencing and state
/// transitions around these calls.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// `GET /stacks`.
    async fn list_stacks(&self) -> Result<Vec<StackRecord>, BackendError>;

    /// `POST /stacks`.
    async fn create_stack(&self, stack: &NewStack) -> Result<StackRecord, BackendError>;

    /// `GET /workflows/{id}`. A 404 means "no saved workflow yet" and maps
    /// to `Ok(None)`.
    async fn fetch_workflow(&self, workflow_id: &str)
    -> Result<Option<SavedWorkflow>, BackendError>;

    /// `PUT /workflows/{id}` with the compiled request body.
    async fn store_workflow(
        &self,
        workflow_id: &str,
        request: &ExecutionRequest,
    ) -> Result<(), BackendError>;

    /// `POST /workflows/{id}/upload`, multipart field `file`.
    async fn upload_document(
        &self,
        workflow_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, BackendError>;

    /// `POST /workflows/{id}/build` with the compiled request body.
    async fn build(
        &self,
        workflow_id: &str,
        request: &ExecutionRequest,
    ) -> Result<BuildOutcome, BackendError>;

    /// `POST /workflows/{id}/chat` with `{message}`.
    async fn chat(&self, workflow_id: &str, message: &str) -> Result<ChatReply, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_receipt_accepts_every_observed_field_name() {
        for key in ["id", "document_id", "uid"] {
            let body = json!({ key: "doc-7" });
            let receipt = UploadReceipt::from_response(&body).unwrap();
            assert_eq!(receipt.document_id, "doc-7");
        }
        assert!(UploadReceipt::from_response(&json!({"detail": "nope"})).is_none());
        assert!(UploadReceipt::from_response(&json!({"id": 7})).is_none());
    }

    #[test]
    fn chat_reply_fallback_chain() {
        let primary = ChatReply {
            response: Some("from response".into()),
            message: Some("from message".into()),
        };
        assert_eq!(primary.text(), "from response");

        let fallback = ChatReply {
            response: None,
            message: Some("from message".into()),
        };
        assert_eq!(fallback.text(), "from message");

        assert_eq!(ChatReply::default().text(), "No response from server.");
    }

    #[test]
    fn build_outcome_keeps_unknown_fields() {
        let outcome: BuildOutcome =
            serde_json::from_value(json!({"answer": "hi", "elapsed_ms": 12})).unwrap();
        assert_eq!(outcome.answer_text(), "hi");
        assert_eq!(outcome.extra["elapsed_ms"], 12);

        let empty: BuildOutcome = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.answer_text(), "Workflow executed successfully.");
    }

    #[test]
    fn stack_record_accepts_snake_case_timestamp() {
        let record: StackRecord = serde_json::from_value(json!({
            "id": "s1",
            "name": "Chat With AI",
            "description": null,
            "created_at": "2025-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(record.id, "s1");
    }
}
