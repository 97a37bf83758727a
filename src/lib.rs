//! Client core for a streaming chat backend.
//!
//! This crate implements the response-controller side of a chat UI: it
//! opens `POST /api/chat/stream`, decodes the Server-Sent Events frame
//! protocol into typed events regardless of how the network chunked the
//! bytes, and drives an ordered conversation store where the answer grows
//! inside a streaming placeholder until the session completes, is
//! cancelled, or fails. A debounced sidecar keeps an advisory cost estimate
//! for the current draft, and a small preferences layer persists settings
//! across sessions.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use routerchat::{ChatClient, ChatSession, Settings};
//!
//! # async fn example() -> routerchat::Result<()> {
//! let client = Arc::new(ChatClient::new(None)?);
//! let session = ChatSession::new(client);
//! session.send("Hello!", "gpt-4o-mini", &Settings::default()).await?;
//! for message in session.snapshot() {
//!     println!("{:?}: {}", message.role, message.content);
//! }
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod client;
pub mod conversation;
pub mod error;
pub mod estimate;
pub mod observability;
pub mod prefs;
pub mod session;
pub mod sse;
pub mod types;

// Re-exports
pub use client::{ByteStream, ChatClient, Transport};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use estimate::CostEstimator;
pub use prefs::{ClientPrefs, KeyValueStore, Theme};
pub use session::{ChatSession, SendOutcome, SessionHandle, INTERRUPTED_MARKER};
pub use sse::decode_sse;
pub use types::{
    ChatRequest, ChatResponse, ChatStreamRequest, CostEstimate, CostEstimateRequest,
    CostEstimateResponse, CostInfo, FinishReason, HistoryEntry, Message, MessageId, Role, Settings,
    StreamEvent, SystemPromptResponse, Verbosity,
};
