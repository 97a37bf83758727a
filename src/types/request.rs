use serde::{Deserialize, Serialize};

use crate::types::message::{Message, Role};
use crate::types::settings::{Settings, Verbosity};

/// One prior conversation turn, as sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Turn author.
    pub role: Role,
    /// Turn text.
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body for `POST /api/chat/stream`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatStreamRequest {
    /// The message to answer.
    pub message: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Requested verbosity.
    pub verbosity: Verbosity,
    /// Penalty for repeated tokens.
    pub frequency_penalty: f32,
    /// Nucleus sampling value.
    pub top_p: f32,
    /// Whether the backend should prepend its system prompt.
    pub use_system_prompt: bool,
    /// Whether the backend should apply the business style layer.
    pub use_ia_style: bool,
    /// Prior turns, omitted when the conversation is fresh.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    /// Response token limit, omitted when unset or non-positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatStreamRequest {
    /// Builds a streaming request from a settings snapshot.
    pub fn new(
        message: impl Into<String>,
        model: impl Into<String>,
        settings: &Settings,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            temperature: settings.temperature,
            verbosity: settings.verbosity,
            frequency_penalty: settings.frequency_penalty,
            top_p: settings.top_p,
            use_system_prompt: settings.use_system_prompt,
            use_ia_style: settings.use_ia_style,
            history,
            max_tokens: settings.effective_max_tokens(),
        }
    }
}

/// Request body for the non-streaming `POST /api/chat` endpoint.
///
/// The flat variant: no system-prompt toggles and no history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The message to answer.
    pub message: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Requested verbosity.
    pub verbosity: Verbosity,
    /// Penalty for repeated tokens.
    pub frequency_penalty: f32,
    /// Nucleus sampling value.
    pub top_p: f32,
    /// Response token limit, omitted when unset or non-positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Builds a non-streaming request from a settings snapshot.
    pub fn new(message: impl Into<String>, model: impl Into<String>, settings: &Settings) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            temperature: settings.temperature,
            verbosity: settings.verbosity,
            frequency_penalty: settings.frequency_penalty,
            top_p: settings.top_p,
            max_tokens: settings.effective_max_tokens(),
        }
    }
}

/// Request body for `POST /api/estimate-cost`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostEstimateRequest {
    /// The draft text to estimate.
    pub message: String,
    /// Model identifier.
    pub model: String,
    /// Prior turns, omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    /// Response token limit, omitted when unset or non-positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether the backend should count the system prompt.
    pub use_system_prompt: bool,
    /// Whether the backend should count the business style layer.
    pub use_ia_style: bool,
}

impl CostEstimateRequest {
    /// Builds an estimation request from a settings snapshot.
    pub fn new(message: impl Into<String>, model: impl Into<String>, settings: &Settings) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            history: Vec::new(),
            max_tokens: settings.effective_max_tokens(),
            use_system_prompt: settings.use_system_prompt,
            use_ia_style: settings.use_ia_style,
        }
    }

    /// Attaches prior turns for a more accurate estimate.
    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::MessageId;

    #[test]
    fn unset_max_tokens_is_not_serialized() {
        let request = ChatStreamRequest::new("hi", "m1", &Settings::default(), Vec::new());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("history").is_none());
    }

    #[test]
    fn zero_max_tokens_is_not_serialized() {
        let settings = Settings::new().with_max_tokens(0);
        let request = ChatStreamRequest::new("hi", "m1", &settings, Vec::new());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn positive_max_tokens_is_serialized_verbatim() {
        let settings = Settings::new().with_max_tokens(2048);
        let request = ChatRequest::new("hi", "m1", &settings);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], serde_json::json!(2048));
    }

    #[test]
    fn history_is_serialized_when_present() {
        let history = vec![HistoryEntry::from(&Message::user(MessageId(0), "hello"))];
        let request = ChatStreamRequest::new("hi", "m1", &Settings::default(), history);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["history"],
            serde_json::json!([{"role": "user", "content": "hello"}])
        );
    }

    #[test]
    fn estimate_request_carries_toggles() {
        let request = CostEstimateRequest::new("draft", "m1", &Settings::default());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["use_system_prompt"], serde_json::json!(true));
        assert_eq!(json["use_ia_style"], serde_json::json!(false));
        assert!(json.get("history").is_none());
    }
}
