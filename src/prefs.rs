//! Persisted client preferences.
//!
//! The UI shell persists a handful of values across sessions in a string
//! key-value store. [`KeyValueStore`] abstracts the store; [`ClientPrefs`]
//! is the typed snapshot loaded from it. Loading is total: missing keys and
//! snapshots that fail to parse fall back to defaults rather than erroring.

use serde::{Deserialize, Serialize};

use crate::types::Settings;

/// Key under which the settings snapshot is stored, as JSON.
pub const SETTINGS_KEY: &str = "chatSettings";

/// Key under which the theme choice is stored.
pub const THEME_KEY: &str = "theme";

/// Key under which the cost-estimate visibility toggle is stored.
pub const SHOW_COST_ESTIMATE_KEY: &str = "showCostEstimate";

/// The default token limit of an earlier release. Persisted snapshots that
/// still carry it are treated as unset.
const LEGACY_MAX_TOKENS: u32 = 1000;

/// A persistent string store, localStorage-shaped.
pub trait KeyValueStore {
    /// The stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);
}

/// UI color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark theme, the default.
    #[default]
    Dark,
    /// Light theme.
    Light,
}

impl Theme {
    fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

/// The client preferences persisted across sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientPrefs {
    /// Generation settings snapshot.
    pub settings: Settings,
    /// Color theme.
    pub theme: Theme,
    /// Whether the pre-send cost estimate is shown. Defaults to on.
    pub show_cost_estimate: bool,
}

impl Default for ClientPrefs {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            theme: Theme::Dark,
            show_cost_estimate: true,
        }
    }
}

impl ClientPrefs {
    /// Loads preferences from the store, falling back to defaults for
    /// missing or unparseable values.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut settings = store
            .get(SETTINGS_KEY)
            .and_then(|raw| serde_json::from_str::<Settings>(&raw).ok())
            .unwrap_or_default();
        if settings.max_tokens == Some(LEGACY_MAX_TOKENS) {
            settings.max_tokens = None;
        }

        let theme = match store.get(THEME_KEY).as_deref() {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        };

        let show_cost_estimate = store
            .get(SHOW_COST_ESTIMATE_KEY)
            .map(|v| v == "true")
            .unwrap_or(true);

        Self {
            settings,
            theme,
            show_cost_estimate,
        }
    }

    /// Writes all preferences back to the store.
    pub fn save(&self, store: &dyn KeyValueStore) {
        if let Ok(raw) = serde_json::to_string(&self.settings) {
            store.set(SETTINGS_KEY, &raw);
        }
        store.set(THEME_KEY, self.theme.as_str());
        store.set(
            SHOW_COST_ESTIMATE_KEY,
            if self.show_cost_estimate { "true" } else { "false" },
        );
    }
}
