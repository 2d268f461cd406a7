//! Reqwest implementation of the execution-backend contract.
//!
//! The base URL comes from the environment (`STACKFORGE_SERVER_URL`), with
//! `.env` files honored via dotenvy. No local timeout is enforced; the
//! transport layer owns that.

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;

use crate::backend::{
    BackendError, BuildOutcome, ChatReply, ExecutionBackend, NewStack, SavedWorkflow, StackRecord,
    UploadReceipt,
};
use crate::compiler::ExecutionRequest;

/// Connection settings for [`HttpBackend`].
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Base URL of the execution service, without a trailing slash.
    pub base_url: String,
}

impl BackendConfig {
    /// Environment variable naming the execution service base URL.
    pub const SERVER_URL_VAR: &'static str = "STACKFORGE_SERVER_URL";
    /// Default base URL when the environment does not name one.
    pub const DEFAULT_SERVER_URL: &'static str = "http://localhost:8000";

    /// Resolves configuration from the environment (and `.env`).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base_url = std::env::var(Self::SERVER_URL_VAR)
            .unwrap_or_else(|_| Self::DEFAULT_SERVER_URL.to_string());
        Self::new(base_url)
    }

    /// Uses an explicit base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }
}

/// HTTP client for the execution service.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Creates a backend from explicit configuration.
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Creates a backend configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(BackendConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Maps a non-2xx response to [`BackendError::Status`], surfacing the
    /// body's `detail` or `error` string when one is present.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let code = status.as_u16();
        let detail = match response.json::<Value>().await {
            Ok(body) => body
                .get("detail")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        tracing::warn!(code, %detail, "backend request failed");
        Err(BackendError::Status { code, detail })
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport {
        message: err.to_string(),
    }
}

#[async_trait]
impl ExecutionBackend for HttpBackend {
    async fn list_stacks(&self) -> Result<Vec<StackRecord>, BackendError> {
        let response = self
            .client
            .get(self.url("/stacks"))
            .send()
            .await
            .map_err(transport)?;
        Self::check(response)
            .await?
            .json::<Vec<StackRecord>>()
            .await
            .map_err(transport)
    }

    async fn create_stack(&self, stack: &NewStack) -> Result<StackRecord, BackendError> {
        let response = self
            .client
            .post(self.url("/stacks"))
            .json(stack)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response)
            .await?
            .json::<StackRecord>()
            .await
            .map_err(transport)
    }

    async fn fetch_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<SavedWorkflow>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/workflows/{workflow_id}")))
            .send()
            .await
            .map_err(transport)?;
        // 404 means the workflow has never been saved; start fresh.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(workflow_id, "no saved workflow yet");
            return Ok(None);
        }
        let saved = Self::check(response)
            .await?
            .json::<SavedWorkflow>()
            .await
            .map_err(transport)?;
        Ok(Some(saved))
    }

    async fn store_workflow(
        &self,
        workflow_id: &str,
        request: &ExecutionRequest,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.url(&format!("/workflows/{workflow_id}")))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upload_document(
        &self,
        workflow_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, BackendError> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url(&format!("/workflows/{workflow_id}/upload")))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let body = Self::check(response)
            .await?
            .json::<Value>()
            .await
            .map_err(transport)?;
        UploadReceipt::from_response(&body).ok_or_else(|| BackendError::Status {
            code: 200,
            detail: "upload response carried no document id".to_string(),
        })
    }

    async fn build(
        &self,
        workflow_id: &str,
        request: &ExecutionRequest,
    ) -> Result<BuildOutcome, BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/workflows/{workflow_id}/build")))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response)
            .await?
            .json::<BuildOutcome>()
            .await
            .map_err(transport)
    }

    async fn chat(&self, workflow_id: &str, message: &str) -> Result<ChatReply, BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/workflows/{workflow_id}/chat")))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .map_err(transport)?;
        Self::check(response)
            .await?
            .json::<ChatReply>()
            .await
            .map_err(transport)
    }
}
