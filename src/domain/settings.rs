use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:5000/analyze";

/// Keys the options page persists in the synced scope.
pub const SETTINGS_KEYS: &[&str] = &[
    "apiEndpoint",
    "apiKey",
    "showWarnings",
    "warningDuration",
    "confidenceThreshold",
    "enableFallback",
    "customKeywords",
    "enableLogging",
    "cacheResults",
];

/// Process-wide configuration snapshot. Never mutated in place: a reload
/// builds a new value and swaps it in whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_endpoint: String,
    pub api_key: Option<String>,
    pub show_warnings: bool,
    /// Banner auto-dismiss delay in milliseconds; 0 keeps it until dismissed.
    pub warning_duration: u64,
    pub confidence_threshold: f64,
    pub enable_fallback: bool,
    pub custom_keywords: Vec<String>,
    pub enable_logging: bool,
    pub cache_results: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            api_key: None,
            show_warnings: true,
            warning_duration: 15_000,
            confidence_threshold: 0.7,
            enable_fallback: true,
            custom_keywords: Vec::new(),
            enable_logging: false,
            cache_results: true,
        }
    }
}

impl Settings {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn auto_dismiss(&self) -> Option<Duration> {
        (self.warning_duration > 0).then(|| Duration::from_millis(self.warning_duration))
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Builds a snapshot from stored key/value pairs laid over `base`.
    /// Unknown keys are ignored; a value that does not fit its key keeps
    /// the base value for that key only.
    pub fn from_stored(base: &Settings, stored: Map<String, Value>) -> (Self, Vec<String>) {
        let mut accepted = base.to_stored();
        let mut rejected = Vec::new();
        for (key, value) in stored {
            if !SETTINGS_KEYS.contains(&key.as_str()) {
                continue;
            }
            let mut single = Map::new();
            single.insert(key.clone(), value.clone());
            if serde_json::from_value::<Settings>(Value::Object(single)).is_ok() {
                accepted.insert(key, value);
            } else {
                rejected.push(key);
            }
        }
        let settings =
            serde_json::from_value(Value::Object(accepted)).unwrap_or_else(|_| base.clone());
        (settings, rejected)
    }

    pub fn to_stored(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_match_options_page() {
        let settings = Settings::default();
        assert_eq!(settings.api_endpoint, DEFAULT_API_ENDPOINT);
        assert!(settings.show_warnings);
        assert_eq!(settings.auto_dismiss(), Some(Duration::from_millis(15_000)));
        assert!(settings.enable_fallback);
        assert!(settings.cache_results);
    }

    #[test]
    fn zero_duration_never_auto_dismisses() {
        let settings = Settings {
            warning_duration: 0,
            ..Settings::default()
        };
        assert_eq!(settings.auto_dismiss(), None);
    }

    #[test]
    fn bad_stored_value_only_resets_its_own_key() {
        let stored = json!({
            "apiEndpoint": "http://10.0.0.5:5000/analyze",
            "warningDuration": "soon",
            "enableFallback": false,
            "somethingElse": 1
        });
        let Value::Object(stored) = stored else { unreachable!() };
        let (settings, rejected) = Settings::from_stored(&Settings::default(), stored);
        assert_eq!(settings.api_endpoint, "http://10.0.0.5:5000/analyze");
        assert_eq!(settings.warning_duration, 15_000);
        assert!(!settings.enable_fallback);
        assert_eq!(rejected, vec!["warningDuration".to_string()]);
    }

    #[test]
    fn missing_keys_keep_base_values() {
        let base = Settings::with_endpoint("http://inference.internal/analyze");
        let stored = json!({"showWarnings": false});
        let Value::Object(stored) = stored else { unreachable!() };
        let (settings, rejected) = Settings::from_stored(&base, stored);
        assert!(rejected.is_empty());
        assert_eq!(settings.api_endpoint, "http://inference.internal/analyze");
        assert!(!settings.show_warnings);
    }

    #[test]
    fn stored_round_trip_uses_synced_key_names() {
        let stored = Settings::default().to_stored();
        for key in SETTINGS_KEYS {
            assert!(stored.contains_key(*key), "missing {key}");
        }
    }
}
