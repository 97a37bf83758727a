use serde::{Deserialize, Serialize};

/// Response verbosity requested from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Short answers.
    Low,
    /// Balanced answers.
    #[default]
    Medium,
    /// Detailed answers.
    High,
}

/// Generation settings, passed by value into each request.
///
/// `max_tokens` of `None` (or any value `<= 0` arriving from persisted
/// state) means "omit from the request" and leaves the response length to
/// the server default. No component owns a `Settings` beyond the request
/// that reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Response token limit, omitted from requests when `None`.
    pub max_tokens: Option<u32>,
    /// Requested response verbosity.
    pub verbosity: Verbosity,
    /// Penalty for repeated tokens.
    pub frequency_penalty: f32,
    /// Nucleus sampling value.
    pub top_p: f32,
    /// Whether the backend should prepend its system prompt.
    pub use_system_prompt: bool,
    /// Whether the backend should apply the business-correspondence style
    /// layer.
    pub use_ia_style: bool,
}

impl Default for Settings {
    fn default() -> Self {
        // Business-correspondence preset, the backend's recommended defaults.
        Self {
            temperature: 0.3,
            max_tokens: None,
            verbosity: Verbosity::Medium,
            frequency_penalty: 0.3,
            top_p: 0.9,
            use_system_prompt: true,
            use_ia_style: false,
        }
    }
}

impl Settings {
    /// Creates the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the response token limit.
    pub fn with_max_tokens(mut self, max_tokens: impl Into<Option<u32>>) -> Self {
        self.max_tokens = max_tokens.into();
        self
    }

    /// Sets the verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Returns the token limit to serialize, filtering out unset and
    /// non-positive values.
    pub fn effective_max_tokens(&self) -> Option<u32> {
        self.max_tokens.filter(|tokens| *tokens > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_business_preset() {
        let settings = Settings::default();
        assert_eq!(settings.temperature, 0.3);
        assert_eq!(settings.max_tokens, None);
        assert_eq!(settings.verbosity, Verbosity::Medium);
        assert_eq!(settings.frequency_penalty, 0.3);
        assert_eq!(settings.top_p, 0.9);
        assert!(settings.use_system_prompt);
        assert!(!settings.use_ia_style);
    }

    #[test]
    fn verbosity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Verbosity::High).unwrap(), "\"high\"");
    }

    #[test]
    fn partial_snapshot_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"temperature": 1.0}"#).unwrap();
        assert_eq!(settings.temperature, 1.0);
        assert_eq!(settings.top_p, 0.9);
    }

    #[test]
    fn effective_max_tokens_filters_zero() {
        assert_eq!(Settings::new().with_max_tokens(0).effective_max_tokens(), None);
        assert_eq!(
            Settings::new().with_max_tokens(512).effective_max_tokens(),
            Some(512)
        );
        assert_eq!(Settings::new().effective_max_tokens(), None);
    }
}
