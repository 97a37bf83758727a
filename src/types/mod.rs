// Public modules
pub mod cost;
pub mod message;
pub mod request;
pub mod response;
pub mod settings;
pub mod stream_event;

// Re-exports
pub use cost::{CostEstimate, CostInfo};
pub use message::{FinishReason, Message, MessageId, Role};
pub use request::{ChatRequest, ChatStreamRequest, CostEstimateRequest, HistoryEntry};
pub use response::{ChatResponse, CostEstimateResponse, SystemPromptResponse};
pub use settings::{Settings, Verbosity};
pub use stream_event::StreamEvent;
