//! The ordered conversation store.
//!
//! Messages are append-only; the single exception is the in-place patching
//! of the one streaming assistant placeholder, addressed by the
//! [`MessageId`] handed out when it was appended. The store never has more
//! than one streaming entry because the session controller refuses to start
//! a send while one is active.

use crate::types::{CostInfo, FinishReason, HistoryEntry, Message, MessageId};

/// An ordered sequence of chat messages, insertion order = chat order.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The messages in chat order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no messages have been appended.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The id of the streaming placeholder, if a stream is active.
    pub fn streaming_id(&self) -> Option<MessageId> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_streaming)
            .map(|m| m.id)
    }

    /// Prior turns suitable for the `history` request field: finalized,
    /// non-error messages in order.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter(|m| !m.is_streaming && !m.is_error)
            .map(HistoryEntry::from)
            .collect()
    }

    /// Appends a user message and returns its id.
    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        let id = self.allocate_id();
        self.messages.push(Message::user(id, content));
        id
    }

    /// Appends the streaming assistant placeholder for a new session and
    /// returns its id.
    pub fn push_streaming_assistant(&mut self, model: impl Into<String>) -> MessageId {
        debug_assert!(self.streaming_id().is_none());
        let id = self.allocate_id();
        self.messages.push(Message::streaming_assistant(id, model));
        id
    }

    /// Replaces the streaming placeholder's content with the accumulated
    /// text so far. Returns false if `id` is not the active placeholder.
    pub fn patch_streaming(&mut self, id: MessageId, content: &str) -> bool {
        let Some(message) = self.streaming_mut(id) else {
            return false;
        };
        message.content.clear();
        message.content.push_str(content);
        true
    }

    /// Finalizes the placeholder after a completed stream.
    pub fn complete_streaming(
        &mut self,
        id: MessageId,
        content: String,
        model: String,
        finish_reason: Option<FinishReason>,
        cost: Option<CostInfo>,
    ) -> bool {
        let Some(message) = self.streaming_mut(id) else {
            return false;
        };
        message.content = content;
        message.model = Some(model);
        message.finish_reason = finish_reason;
        message.cost = cost;
        message.is_streaming = false;
        true
    }

    /// Finalizes the placeholder after a user cancellation. The partial
    /// content is kept and the message is not marked as an error.
    pub fn interrupt_streaming(&mut self, id: MessageId, content: String) -> bool {
        let Some(message) = self.streaming_mut(id) else {
            return false;
        };
        message.content = content;
        message.is_streaming = false;
        true
    }

    /// Finalizes the placeholder after a session failure with a
    /// human-readable summary.
    pub fn fail_streaming(&mut self, id: MessageId, summary: &str) -> bool {
        let Some(message) = self.streaming_mut(id) else {
            return false;
        };
        message.content = format!("❌ {summary}");
        message.is_error = true;
        message.is_streaming = false;
        true
    }

    fn streaming_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id && m.is_streaming)
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn append_preserves_order() {
        let mut conversation = Conversation::new();
        conversation.push_user("first");
        conversation.push_streaming_assistant("m1");
        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn at_most_one_streaming_message() {
        let mut conversation = Conversation::new();
        conversation.push_user("first");
        let id = conversation.push_streaming_assistant("m1");
        assert_eq!(conversation.streaming_id(), Some(id));
        assert_eq!(
            conversation
                .messages()
                .iter()
                .filter(|m| m.is_streaming)
                .count(),
            1
        );
        conversation.complete_streaming(id, "done".to_string(), "m1".to_string(), None, None);
        assert_eq!(conversation.streaming_id(), None);
    }

    #[test]
    fn patch_targets_only_the_placeholder() {
        let mut conversation = Conversation::new();
        let user_id = conversation.push_user("question");
        let id = conversation.push_streaming_assistant("m1");
        assert!(!conversation.patch_streaming(user_id, "nope"));
        assert!(conversation.patch_streaming(id, "Hel"));
        assert!(conversation.patch_streaming(id, "Hello"));
        assert_eq!(conversation.messages()[1].content, "Hello");
        assert_eq!(conversation.messages()[0].content, "question");
    }

    #[test]
    fn finalized_message_rejects_further_patches() {
        let mut conversation = Conversation::new();
        let id = conversation.push_streaming_assistant("m1");
        conversation.complete_streaming(id, "final".to_string(), "m1".to_string(), None, None);
        assert!(!conversation.patch_streaming(id, "late token"));
        assert_eq!(conversation.messages()[0].content, "final");
    }

    #[test]
    fn interruption_keeps_partial_content_without_error() {
        let mut conversation = Conversation::new();
        let id = conversation.push_streaming_assistant("m1");
        conversation.patch_streaming(id, "partial");
        conversation.interrupt_streaming(id, "partial".to_string());
        let message = &conversation.messages()[0];
        assert_eq!(message.content, "partial");
        assert!(!message.is_streaming);
        assert!(!message.is_error);
    }

    #[test]
    fn failure_sets_marker_and_error_flag() {
        let mut conversation = Conversation::new();
        let id = conversation.push_streaming_assistant("m1");
        conversation.fail_streaming(id, "rate limited");
        let message = &conversation.messages()[0];
        assert_eq!(message.content, "❌ rate limited");
        assert!(message.is_error);
        assert!(!message.is_streaming);
    }

    #[test]
    fn history_excludes_streaming_and_error_entries() {
        let mut conversation = Conversation::new();
        conversation.push_user("one");
        let failed = conversation.push_streaming_assistant("m1");
        conversation.fail_streaming(failed, "boom");
        conversation.push_user("two");
        conversation.push_streaming_assistant("m1");
        let history = conversation.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "one");
        assert_eq!(history[1].content, "two");
    }
}
