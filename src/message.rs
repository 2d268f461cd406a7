//! Chat transcript messages.
//!
//! Messages are the unit of the session transcript: user questions,
//! assistant answers, and synthetic entries the controller appends when a
//! build or chat request fails. Each message carries a generated id and a
//! UTC timestamp so transcripts stay ordered and addressable after
//! serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in a session transcript.
///
/// # Examples
///
/// ```
/// use stackforge::message::ChatMessage;
///
/// let question = ChatMessage::user("What does this contract say about notice periods?");
/// let answer = ChatMessage::assistant("Thirty days, per section 4.2.");
///
/// assert!(question.has_role(ChatMessage::USER));
/// assert!(answer.has_role(ChatMessage::ASSISTANT));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Generated unique id for this entry.
    pub id: String,
    /// The role of the sender (e.g., "user", "assistant", "system").
    ///
    /// Use the constants on [`ChatMessage`] for standardized values.
    pub role: String,
    /// The text content of the message.
    pub content: String,
    /// When the entry was appended to the transcript.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";

    /// Creates a new message with the specified role and content.
    ///
    /// # Examples
    /// ```
    /// use stackforge::message::ChatMessage;
    ///
    /// let msg = ChatMessage::new(ChatMessage::USER, "Hello!");
    /// assert_eq!(msg.role, "user");
    /// assert_eq!(msg.content, "Hello!");
    /// ```
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4()),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message with the specified content.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convenience_constructors() {
        let user_msg = ChatMessage::user("Hello");
        assert_eq!(user_msg.role, ChatMessage::USER);
        assert_eq!(user_msg.content, "Hello");

        let assistant_msg = ChatMessage::assistant("Hi there!");
        assert_eq!(assistant_msg.role, ChatMessage::ASSISTANT);

        let system_msg = ChatMessage::system("You are helpful");
        assert_eq!(system_msg.role, ChatMessage::SYSTEM);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ChatMessage::user("one");
        let b = ChatMessage::user("one");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("msg-"));
    }

    #[test]
    fn test_role_checking() {
        let msg = ChatMessage::assistant("answer");
        assert!(msg.has_role(ChatMessage::ASSISTANT));
        assert!(!msg.has_role(ChatMessage::USER));
        assert!(!msg.has_role(ChatMessage::SYSTEM));
    }

    #[test]
    fn test_serialization_round_trip() {
        let original = ChatMessage::user("Test message");
        let json = serde_json::to_string(&original).expect("serialization failed");
        let parsed: ChatMessage = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(original, parsed);
    }
}
