//! Per-component configuration as a tagged union.
//!
//! Each [`ComponentType`](crate::types::ComponentType) carries its own
//! strongly typed configuration struct, discriminated by the `type` tag on
//! the wire. Consumers ([`crate::validator`], [`crate::compiler`]) pattern
//! match over [`ComponentConfig`] instead of probing optional keys in a
//! free-form map.
//!
//! Two operations matter here:
//!
//! - [`ComponentConfig::merge`] applies a partial JSON object (the store's
//!   update path), field by field. Unknown keys and type-mismatched values
//!   are ignored; merging is total and never fails.
//! - [`ComponentConfig::validate`] performs per-variant range checks and
//!   returns structured [`ConfigIssue`]s. Issues are advisory diagnostics,
//!   not errors; the coarse workflow validity check in
//!   [`crate::validator`] does not consult them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ComponentType;

/// Configuration for one workflow component, keyed by component type.
///
/// Defaults are materialized at construction time
/// ([`ComponentConfig::default_for`]), so a compiled workflow always carries
/// fully resolved configuration and the execution backend never recomputes
/// defaults.
///
/// # Examples
///
/// ```
/// use stackforge::config::ComponentConfig;
/// use stackforge::types::ComponentType;
/// use serde_json::json;
///
/// let mut config = ComponentConfig::default_for(ComponentType::LlmEngine);
/// config.merge(&json!({"temperature": 0.2, "systemPrompt": "Be terse."}));
///
/// let ComponentConfig::LlmEngine(llm) = &config else { unreachable!() };
/// assert_eq!(llm.temperature, 0.2);
/// assert_eq!(llm.system_prompt, "Be terse.");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ComponentConfig {
    UserQuery(UserQueryConfig),
    KnowledgeBase(KnowledgeBaseConfig),
    LlmEngine(LlmEngineConfig),
    Output(OutputConfig),
}

/// Configuration for the user-query entry component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQueryConfig {
    /// Placeholder text shown in the query input field.
    pub placeholder: String,
}

impl Default for UserQueryConfig {
    fn default() -> Self {
        Self {
            placeholder: "Enter your question...".to_string(),
        }
    }
}

/// Upload lifecycle of a document attached to a knowledge base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadStatus {
    Pending,
    Uploaded,
    Error,
}

/// Reference to a document ingested by the execution backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Backend-assigned document id.
    pub id: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// Current upload state.
    pub status: UploadStatus,
}

/// Configuration for the knowledge-base component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseConfig {
    /// File extensions accepted for upload.
    pub allowed_file_types: Vec<String>,
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
    /// Characters per chunk at ingestion time.
    pub chunk_size: u32,
    /// Character overlap between adjacent chunks.
    pub chunk_overlap: u32,
    /// Embedding model name; the backend owns the valid set.
    pub embedding_model: String,
    /// API key for the embedding provider.
    #[serde(default)]
    pub api_key: String,
    /// Documents already ingested for this node.
    #[serde(default)]
    pub uploaded_files: Vec<FileRef>,
}

impl KnowledgeBaseConfig {
    /// Default embedding model name.
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "text-embedding-3-large";
    /// Default upload cap: 10 MiB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            allowed_file_types: vec!["pdf".to_string(), "txt".to_string(), "docx".to_string()],
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_model: Self::DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: String::new(),
            uploaded_files: Vec::new(),
        }
    }
}

/// Configuration for the LLM engine component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmEngineConfig {
    /// Model name; the backend owns the valid set.
    pub model: String,
    /// API key for the model provider.
    #[serde(default)]
    pub api_key: String,
    /// Sampling temperature, valid range `[0, 2]`.
    pub temperature: f64,
    /// Completion token cap, must be positive.
    pub max_tokens: u32,
    /// System prompt prepended to every request.
    pub system_prompt: String,
    /// Whether the engine may consult web search.
    pub use_web_search: bool,
    /// SerpAPI key, only meaningful when `use_web_search` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serpapi_key: Option<String>,
}

impl LlmEngineConfig {
    /// Default model name.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
}

impl Default for LlmEngineConfig {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            temperature: 0.7,
            max_tokens: 2000,
            system_prompt: String::new(),
            use_web_search: false,
            serpapi_key: None,
        }
    }
}

/// How the output component renders results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    Chat,
    Formatted,
}

/// Configuration for the output component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Rendering mode for pipeline results.
    pub display_mode: DisplayMode,
    /// Whether result entries carry a timestamp.
    pub show_timestamp: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Chat,
            show_timestamp: true,
        }
    }
}

/// A single advisory finding from per-variant configuration validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    /// Wire name of the offending field.
    pub field: &'static str,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ConfigIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl ComponentConfig {
    /// The default-config factory for a component type.
    #[must_use]
    pub fn default_for(kind: ComponentType) -> Self {
        match kind {
            ComponentType::UserQuery => ComponentConfig::UserQuery(UserQueryConfig::default()),
            ComponentType::KnowledgeBase => {
                ComponentConfig::KnowledgeBase(KnowledgeBaseConfig::default())
            }
            ComponentType::LlmEngine => ComponentConfig::LlmEngine(LlmEngineConfig::default()),
            ComponentType::Output => ComponentConfig::Output(OutputConfig::default()),
        }
    }

    /// The component type this configuration belongs to.
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentConfig::UserQuery(_) => ComponentType::UserQuery,
            ComponentConfig::KnowledgeBase(_) => ComponentType::KnowledgeBase,
            ComponentConfig::LlmEngine(_) => ComponentType::LlmEngine,
            ComponentConfig::Output(_) => ComponentType::Output,
        }
    }

    /// Merge a partial JSON object into this configuration, field by field.
    ///
    /// Keys not belonging to the variant and values of the wrong type are
    /// ignored. Merging is total: it never fails and never replaces the
    /// whole variant.
    pub fn merge(&mut self, partial: &Value) {
        let Some(map) = partial.as_object() else {
            return;
        };
        match self {
            ComponentConfig::UserQuery(c) => {
                merge_string(map, "placeholder", &mut c.placeholder);
            }
            ComponentConfig::KnowledgeBase(c) => {
                merge_string_vec(map, "allowedFileTypes", &mut c.allowed_file_types);
                merge_u64(map, "maxFileSize", &mut c.max_file_size);
                merge_u32(map, "chunkSize", &mut c.chunk_size);
                merge_u32(map, "chunkOverlap", &mut c.chunk_overlap);
                merge_string(map, "embeddingModel", &mut c.embedding_model);
                merge_string(map, "apiKey", &mut c.api_key);
                if let Some(value) = map.get("uploadedFiles")
                    && let Ok(files) = serde_json::from_value::<Vec<FileRef>>(value.clone())
                {
                    c.uploaded_files = files;
                }
            }
            ComponentConfig::LlmEngine(c) => {
                merge_string(map, "model", &mut c.model);
                merge_string(map, "apiKey", &mut c.api_key);
                merge_f64(map, "temperature", &mut c.temperature);
                merge_u32(map, "maxTokens", &mut c.max_tokens);
                merge_string(map, "systemPrompt", &mut c.system_prompt);
                merge_bool(map, "useWebSearch", &mut c.use_web_search);
                if let Some(value) = map.get("serpapiKey") {
                    match value {
                        Value::String(s) => c.serpapi_key = Some(s.clone()),
                        Value::Null => c.serpapi_key = None,
                        _ => {}
                    }
                }
            }
            ComponentConfig::Output(c) => {
                if let Some(value) = map.get("displayMode")
                    && let Ok(mode) = serde_json::from_value::<DisplayMode>(value.clone())
                {
                    c.display_mode = mode;
                }
                merge_bool(map, "showTimestamp", &mut c.show_timestamp);
            }
        }
    }

    /// Range checks over the variant's fields.
    ///
    /// Returns an empty list when the configuration is acceptable. Findings
    /// are advisory and do not gate save/build/chat.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        match self {
            ComponentConfig::UserQuery(_) | ComponentConfig::Output(_) => {}
            ComponentConfig::KnowledgeBase(c) => {
                if c.max_file_size == 0 {
                    issues.push(ConfigIssue::new("maxFileSize", "must be positive"));
                }
                if c.chunk_size == 0 {
                    issues.push(ConfigIssue::new("chunkSize", "must be positive"));
                }
                if c.chunk_overlap >= c.chunk_size && c.chunk_size > 0 {
                    issues.push(ConfigIssue::new(
                        "chunkOverlap",
                        format!(
                            "overlap {} must be smaller than chunk size {}",
                            c.chunk_overlap, c.chunk_size
                        ),
                    ));
                }
                if c.allowed_file_types.is_empty() {
                    issues.push(ConfigIssue::new(
                        "allowedFileTypes",
                        "at least one file type must be allowed",
                    ));
                }
            }
            ComponentConfig::LlmEngine(c) => {
                if !(0.0..=2.0).contains(&c.temperature) {
                    issues.push(ConfigIssue::new(
                        "temperature",
                        format!("{} is outside the valid range [0, 2]", c.temperature),
                    ));
                }
                if c.max_tokens == 0 {
                    issues.push(ConfigIssue::new("maxTokens", "must be positive"));
                }
                if c.use_web_search && c.serpapi_key.as_deref().unwrap_or("").is_empty() {
                    issues.push(ConfigIssue::new(
                        "serpapiKey",
                        "web search is enabled but no SerpAPI key is set",
                    ));
                }
            }
        }
        issues
    }
}

fn merge_string(map: &serde_json::Map<String, Value>, key: &str, slot: &mut String) {
    if let Some(Value::String(s)) = map.get(key) {
        *slot = s.clone();
    }
}

fn merge_bool(map: &serde_json::Map<String, Value>, key: &str, slot: &mut bool) {
    if let Some(Value::Bool(b)) = map.get(key) {
        *slot = *b;
    }
}

fn merge_f64(map: &serde_json::Map<String, Value>, key: &str, slot: &mut f64) {
    if let Some(n) = map.get(key).and_then(Value::as_f64) {
        *slot = n;
    }
}

fn merge_u32(map: &serde_json::Map<String, Value>, key: &str, slot: &mut u32) {
    if let Some(n) = map.get(key).and_then(Value::as_u64)
        && let Ok(n) = u32::try_from(n)
    {
        *slot = n;
    }
}

fn merge_u64(map: &serde_json::Map<String, Value>, key: &str, slot: &mut u64) {
    if let Some(n) = map.get(key).and_then(Value::as_u64) {
        *slot = n;
    }
}

fn merge_string_vec(map: &serde_json::Map<String, Value>, key: &str, slot: &mut Vec<String>) {
    if let Some(Value::Array(items)) = map.get(key) {
        let strings: Vec<String> = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if strings.len() == items.len() {
            *slot = strings;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_contract() {
        let ComponentConfig::UserQuery(q) = ComponentConfig::default_for(ComponentType::UserQuery)
        else {
            panic!("wrong variant");
        };
        assert_eq!(q.placeholder, "Enter your question...");

        let ComponentConfig::KnowledgeBase(kb) =
            ComponentConfig::default_for(ComponentType::KnowledgeBase)
        else {
            panic!("wrong variant");
        };
        assert_eq!(kb.allowed_file_types, vec!["pdf", "txt", "docx"]);
        assert_eq!(kb.max_file_size, 10 * 1024 * 1024);
        assert_eq!(kb.chunk_size, 1000);
        assert_eq!(kb.chunk_overlap, 200);

        let ComponentConfig::LlmEngine(llm) =
            ComponentConfig::default_for(ComponentType::LlmEngine)
        else {
            panic!("wrong variant");
        };
        assert_eq!(llm.temperature, 0.7);
        assert_eq!(llm.max_tokens, 2000);

        let ComponentConfig::Output(out) = ComponentConfig::default_for(ComponentType::Output)
        else {
            panic!("wrong variant");
        };
        assert_eq!(out.display_mode, DisplayMode::Chat);
        assert!(out.show_timestamp);
    }

    #[test]
    fn merge_applies_known_fields_only() {
        let mut config = ComponentConfig::default_for(ComponentType::LlmEngine);
        config.merge(&json!({
            "temperature": 1.5,
            "maxTokens": 512,
            "model": "gpt-4o",
            "placeholder": "not an llm field",
            "bogus": true,
        }));
        let ComponentConfig::LlmEngine(llm) = &config else {
            panic!("variant changed");
        };
        assert_eq!(llm.temperature, 1.5);
        assert_eq!(llm.max_tokens, 512);
        assert_eq!(llm.model, "gpt-4o");
    }

    #[test]
    fn merge_ignores_type_mismatches() {
        let mut config = ComponentConfig::default_for(ComponentType::KnowledgeBase);
        config.merge(&json!({
            "chunkSize": "one thousand",
            "allowedFileTypes": ["pdf", 42],
        }));
        let ComponentConfig::KnowledgeBase(kb) = &config else {
            panic!("variant changed");
        };
        assert_eq!(kb.chunk_size, 1000);
        assert_eq!(kb.allowed_file_types, vec!["pdf", "txt", "docx"]);
    }

    #[test]
    fn merge_with_non_object_is_a_no_op() {
        let mut config = ComponentConfig::default_for(ComponentType::Output);
        let before = config.clone();
        config.merge(&json!("displayMode"));
        config.merge(&json!(null));
        assert_eq!(config, before);
    }

    #[test]
    fn validate_flags_out_of_range_values() {
        let mut config = ComponentConfig::default_for(ComponentType::LlmEngine);
        config.merge(&json!({"temperature": 3.0, "maxTokens": 0}));
        let issues = config.validate();
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert!(fields.contains(&"temperature"));
        assert!(fields.contains(&"maxTokens"));
    }

    #[test]
    fn validate_accepts_defaults() {
        for kind in ComponentType::ALL {
            assert!(ComponentConfig::default_for(kind).validate().is_empty());
        }
    }

    #[test]
    fn validate_flags_overlap_not_smaller_than_chunk() {
        let mut config = ComponentConfig::default_for(ComponentType::KnowledgeBase);
        config.merge(&json!({"chunkSize": 100, "chunkOverlap": 100}));
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.field == "chunkOverlap"));
    }

    #[test]
    fn serde_tag_discriminates_variants() {
        let config = ComponentConfig::default_for(ComponentType::Output);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "output");
        assert_eq!(value["displayMode"], "chat");

        let parsed: ComponentConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, config);
    }
}
