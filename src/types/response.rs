use serde::{Deserialize, Serialize};

use crate::types::cost::CostInfo;

/// Response body of the non-streaming `POST /api/chat` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// The completed answer.
    pub content: String,
    /// Model that actually served the request.
    pub model: String,
    /// Cost of the request, when the backend could compute it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostInfo>,
}

/// Response body of `POST /api/estimate-cost`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostEstimateResponse {
    /// Estimated cost of the draft, in rubles.
    pub estimated_cost_rub: f64,
}

/// Response body of `GET /api/system-prompt`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemPromptResponse {
    /// The system prompt the backend prepends when enabled.
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_without_cost() {
        let json = serde_json::json!({"content": "hi", "model": "m1"});
        let response: ChatResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.content, "hi");
        assert_eq!(response.cost, None);
    }
}
