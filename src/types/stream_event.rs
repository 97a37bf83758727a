use crate::types::cost::CostInfo;
use crate::types::message::FinishReason;

/// One decoded protocol event from the streaming endpoint.
///
/// Produced by the SSE frame decoder, consumed by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An incremental piece of the answer.
    Token {
        /// The token text, appended verbatim to the accumulated content.
        text: String,
    },
    /// The terminal frame. No events follow it.
    Done {
        /// Model that actually served the request, when reported.
        model: Option<String>,
        /// Why generation stopped.
        finish_reason: Option<FinishReason>,
        /// Cost of the request, when the backend could compute it.
        cost: Option<CostInfo>,
    },
    /// An explicit error frame from the backend. Fatal to the session.
    Error {
        /// The backend's error text.
        message: String,
    },
}
