//! Engine-wide settings a host application persists as JSON.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::codec::ConfigCodec;
use crate::evaluator::{DEFAULT_LOG_MAX_BYTES, FilterLog};
use crate::pattern::EmptyPolicy;

/// Tunables shared by loading and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Verdict for patterns without rules.
    pub empty_policy: EmptyPolicy,
    /// Whether evaluations should record a filter log by default.
    pub capture_trace: bool,
    /// Byte budget of the filter log.
    pub log_max_bytes: usize,
    /// Maximum number of rules loaded per pattern; `None` for no limit.
    pub max_rules: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            empty_policy: EmptyPolicy::MatchAll,
            capture_trace: false,
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            max_rules: None,
        }
    }
}

impl EngineSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes settings to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A config codec honoring these settings.
    #[must_use]
    pub const fn codec(&self) -> ConfigCodec {
        ConfigCodec::from_settings(self)
    }

    /// A filter log with the configured budget, if tracing is on.
    #[must_use]
    pub fn new_log(&self) -> Option<FilterLog> {
        self.capture_trace
            .then(|| FilterLog::new(self.log_max_bytes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.empty_policy, EmptyPolicy::MatchAll);
        assert!(!settings.capture_trace);
        assert_eq!(settings.log_max_bytes, 512 * 1024);
        assert_eq!(settings.max_rules, None);
        assert!(settings.new_log().is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings =
            EngineSettings::from_json(r#"{"empty_policy": "match-none", "capture_trace": true}"#)
                .unwrap();
        assert_eq!(settings.empty_policy, EmptyPolicy::MatchNone);
        assert_eq!(settings.log_max_bytes, DEFAULT_LOG_MAX_BYTES);
        assert_eq!(settings.new_log().unwrap().max_bytes(), DEFAULT_LOG_MAX_BYTES);
    }

    #[test]
    fn json_round_trip() {
        let settings = EngineSettings {
            max_rules: Some(8),
            log_max_bytes: 1024,
            ..EngineSettings::default()
        };
        let back = EngineSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            EngineSettings::from_json("{not json"),
            Err(crate::Error::Settings(_))
        ));
    }
}
