//! Streaming session management.
//!
//! [`ChatSession`] owns the conversation store and drives at most one
//! streaming request at a time: it appends the user message and the
//! streaming assistant placeholder, consumes decoded events, patches the
//! placeholder as tokens arrive, and finalizes it on every exit path —
//! completion, cancellation, or failure. Failures terminate at the
//! placeholder and are never thrown to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::Transport;
use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::estimate::CostEstimator;
use crate::observability::{
    SESSION_CANCELLED, SESSION_COMPLETED, SESSION_FAILED, SESSION_SENDS,
};
use crate::sse::decode_sse;
use crate::types::{ChatStreamRequest, Message, MessageId, Settings, StreamEvent};

/// Placeholder content when a session is cancelled before any token
/// arrived.
pub const INTERRUPTED_MARKER: &str = "⏹ Interrupted";

/// How a send resolved. Precondition violations are the only `Err` a send
/// produces; everything past them lands here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The stream delivered its terminal frame.
    Completed,
    /// The user cancelled mid-flight; partial content was kept.
    Cancelled,
    /// The session failed; the placeholder records the summary.
    Failed,
}

/// Handle to the single in-flight streaming request.
///
/// Cloneable so a UI can keep one for its stop button; cancelling is
/// idempotent.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    token: CancellationToken,
    placeholder: MessageId,
}

impl SessionHandle {
    /// Signals cancellation to the session's read loop.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The id of the placeholder this session is patching.
    pub fn placeholder(&self) -> MessageId {
        self.placeholder
    }
}

/// A chat session: one conversation, at most one active stream.
pub struct ChatSession<T: Transport + 'static> {
    transport: Arc<T>,
    estimator: CostEstimator<T>,
    conversation: Mutex<Conversation>,
    loading: AtomicBool,
    active: Mutex<Option<SessionHandle>>,
}

/// Clears the loading flag on every exit path of `send`.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<T: Transport + 'static> ChatSession<T> {
    /// Creates a session over the given transport.
    pub fn new(transport: Arc<T>) -> Self {
        let estimator = CostEstimator::new(Arc::clone(&transport));
        Self {
            transport,
            estimator,
            conversation: Mutex::new(Conversation::new()),
            loading: AtomicBool::new(false),
            active: Mutex::new(None),
        }
    }

    /// The cost-estimation sidecar bound to this session's transport.
    pub fn estimator(&self) -> &CostEstimator<T> {
        &self.estimator
    }

    /// True while a send is in flight. UI input is expected to be blocked
    /// while this holds.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// A handle to the active session, if one exists.
    pub fn handle(&self) -> Option<SessionHandle> {
        self.active.lock().expect("active lock poisoned").clone()
    }

    /// A snapshot of the conversation in chat order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.conversation
            .lock()
            .expect("conversation lock poisoned")
            .messages()
            .to_vec()
    }

    /// Signals cancellation of the active stream. No-op when nothing is in
    /// flight; safe to call repeatedly.
    pub fn cancel(&self) {
        if let Some(handle) = self.active.lock().expect("active lock poisoned").as_ref() {
            handle.cancel();
        }
    }

    /// Sends `text` and streams the answer into the conversation.
    ///
    /// Preconditions: `text` must be non-empty after trimming, and no send
    /// may already be active. Past those, the call always resolves `Ok`:
    /// completion, cancellation, and failure all finalize the placeholder,
    /// and afterwards no message is streaming and the loading flag is
    /// clear.
    pub async fn send(&self, text: &str, model: &str, settings: &Settings) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("message text is empty"));
        }
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::validation("a request is already in flight"));
        }
        let _loading = LoadingGuard(&self.loading);
        SESSION_SENDS.click();

        // Whatever estimate was showing described a draft that no longer
        // exists.
        self.estimator.clear();

        let token = CancellationToken::new();
        let (request, placeholder) = {
            let mut conversation = self.conversation.lock().expect("conversation lock poisoned");
            let history = conversation.history();
            conversation.push_user(text);
            let placeholder = conversation.push_streaming_assistant(model);
            (
                ChatStreamRequest::new(text, model, settings, history),
                placeholder,
            )
        };
        *self.active.lock().expect("active lock poisoned") = Some(SessionHandle {
            token: token.clone(),
            placeholder,
        });

        let outcome = self.run_stream(&request, placeholder, &token).await;

        self.active.lock().expect("active lock poisoned").take();
        match outcome {
            SendOutcome::Completed => SESSION_COMPLETED.click(),
            SendOutcome::Cancelled => SESSION_CANCELLED.click(),
            SendOutcome::Failed => SESSION_FAILED.click(),
        }
        Ok(outcome)
    }

    /// Opens the stream and applies events until a terminal condition.
    ///
    /// The byte stream is dropped on every exit path; cancellation is
    /// checked at each suspension point.
    async fn run_stream(
        &self,
        request: &ChatStreamRequest,
        placeholder: MessageId,
        token: &CancellationToken,
    ) -> SendOutcome {
        let byte_stream = tokio::select! {
            _ = token.cancelled() => {
                self.finalize_interrupted(placeholder, String::new());
                return SendOutcome::Cancelled;
            }
            opened = self.transport.open_stream(request) => match opened {
                Ok(stream) => stream,
                Err(e) => {
                    self.finalize_failed(placeholder, &failure_summary(&e));
                    return SendOutcome::Failed;
                }
            }
        };

        let mut events = Box::pin(decode_sse(byte_stream));
        let mut accumulated = String::new();
        let (model, finish_reason, cost) = loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.finalize_interrupted(placeholder, accumulated);
                    return SendOutcome::Cancelled;
                }
                event = events.next() => match event {
                    Some(Ok(StreamEvent::Token { text })) => {
                        accumulated.push_str(&text);
                        self.conversation
                            .lock()
                            .expect("conversation lock poisoned")
                            .patch_streaming(placeholder, &accumulated);
                    }
                    Some(Ok(StreamEvent::Done { model, finish_reason, cost })) => {
                        break (model, finish_reason, cost);
                    }
                    Some(Ok(StreamEvent::Error { message })) => {
                        self.finalize_failed(placeholder, &message);
                        return SendOutcome::Failed;
                    }
                    Some(Err(e)) => {
                        self.finalize_failed(placeholder, &failure_summary(&e));
                        return SendOutcome::Failed;
                    }
                    None => {
                        self.finalize_failed(placeholder, "stream ended before completion");
                        return SendOutcome::Failed;
                    }
                }
            }
        };
        drop(events);

        let model = model.unwrap_or_else(|| request.model.clone());
        self.conversation
            .lock()
            .expect("conversation lock poisoned")
            .complete_streaming(placeholder, accumulated, model, finish_reason, cost);
        SendOutcome::Completed
    }

    fn finalize_interrupted(&self, placeholder: MessageId, accumulated: String) {
        let content = if accumulated.is_empty() {
            INTERRUPTED_MARKER.to_string()
        } else {
            accumulated
        };
        self.conversation
            .lock()
            .expect("conversation lock poisoned")
            .interrupt_streaming(placeholder, content);
    }

    fn finalize_failed(&self, placeholder: MessageId, summary: &str) {
        self.conversation
            .lock()
            .expect("conversation lock poisoned")
            .fail_streaming(placeholder, summary);
    }
}

/// Human-readable summary for the placeholder, by failure category.
///
/// API errors carry the backend's own message through verbatim; the rest
/// get a category prefix so a user can tell connectivity problems from
/// mid-stream faults.
fn failure_summary(error: &Error) -> String {
    match error {
        Error::Api { message, .. } => message.clone(),
        Error::Connection { .. } => "Network error: could not connect to the server".to_string(),
        Error::Timeout { .. } => "Network error: the request timed out".to_string(),
        Error::Streaming { message, .. } => format!("Stream interrupted: {message}"),
        Error::Encoding { message, .. } => format!("Stream decoding failed: {message}"),
        _ => error.to_string(),
    }
}
