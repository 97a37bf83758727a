use serde::{Deserialize, Serialize};

use crate::types::cost::CostInfo;

/// Identifier for a message within a conversation.
///
/// Handed out by the conversation store in insertion order. The session
/// controller uses it to correlate the streaming placeholder with its
/// session instead of scanning the message list by predicate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed by the user.
    User,
    /// A message produced by the model.
    Assistant,
}

/// Why the model stopped generating.
///
/// The backend proxies this field through from the upstream provider, so
/// unrecognized values are preserved as [`FinishReason::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of the completion.
    Stop,
    /// The completion hit the token limit.
    Length,
    /// The completion was blocked by a content filter.
    ContentFilter,
    /// The model requested a tool invocation.
    ToolCalls,
    /// Any value this client does not recognize.
    #[serde(other)]
    Unknown,
}

/// A single chat message record.
///
/// Invariant: at most one message in a conversation has `is_streaming`
/// set, and it is always the most recently appended assistant message.
/// `content` is append-only while streaming and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// Message author.
    pub role: Role,
    /// Message text. For a streaming placeholder this grows as tokens
    /// arrive.
    pub content: String,
    /// Model that produced the message, for assistant messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Why generation stopped, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Cost of producing the message, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostInfo>,
    /// True while this message is the target of an active stream.
    #[serde(default)]
    pub is_streaming: bool,
    /// True when the message records a session failure rather than model
    /// output.
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    /// Creates a finalized user message.
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            model: None,
            finish_reason: None,
            cost: None,
            is_streaming: false,
            is_error: false,
        }
    }

    /// Creates the streaming assistant placeholder for a new session.
    pub fn streaming_assistant(id: MessageId, model: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            model: Some(model.into()),
            finish_reason: None,
            cost: None,
            is_streaming: true,
            is_error: false,
        }
    }
}
