use serde::{Deserialize, Serialize};

/// Cost of a completed request, reported by the backend with the terminal
/// stream frame and with non-streaming responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CostInfo {
    /// Total cost of the request in rubles, rounded to kopecks.
    pub total_cost_rub: f64,
    /// Tokens consumed by the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    /// Tokens produced by the completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    /// Total tokens for the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl CostInfo {
    /// Creates a cost record with only the total.
    pub fn new(total_cost_rub: f64) -> Self {
        Self {
            total_cost_rub,
            ..Self::default()
        }
    }
}

/// An advisory pre-send cost estimate for the current draft.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostEstimate {
    /// Estimated cost of sending the draft, in rubles.
    pub estimated_cost_rub: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_info_omits_missing_token_counts() {
        let cost = CostInfo::new(0.5);
        let json = serde_json::to_value(&cost).unwrap();
        assert_eq!(json, serde_json::json!({"total_cost_rub": 0.5}));
    }

    #[test]
    fn cost_info_roundtrip_with_tokens() {
        let json = serde_json::json!({
            "total_cost_rub": 1.23,
            "prompt_tokens": 10,
            "completion_tokens": 20,
            "total_tokens": 30,
        });
        let cost: CostInfo = serde_json::from_value(json).unwrap();
        assert_eq!(cost.total_cost_rub, 1.23);
        assert_eq!(cost.prompt_tokens, Some(10));
        assert_eq!(cost.completion_tokens, Some(20));
        assert_eq!(cost.total_tokens, Some(30));
    }
}
