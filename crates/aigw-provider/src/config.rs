use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use uuid::Uuid;

/// One credentialed account inside a provider-type pool.
///
/// Field names are camelCase on disk; the pool file is shared with other
/// tooling. Credential material is an opaque bag this crate never parses,
/// only forwards to the backend-calling layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub credential: JsonValue,
    #[serde(default = "default_true")]
    pub is_healthy: bool,
    /// Administrative override; independent of health.
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub error_count: u32,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_error_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_used: Option<OffsetDateTime>,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_health_check_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_health_check_model: Option<String>,
    /// Models this account must never serve, even when healthy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_supported_models: Vec<String>,
    /// Health probing is opt-in per account.
    #[serde(default)]
    pub check_health: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_model_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ProviderConfig {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            custom_name: None,
            credential: JsonValue::Null,
            is_healthy: true,
            is_disabled: false,
            error_count: 0,
            last_error_time: None,
            last_error_message: None,
            last_used: None,
            usage_count: 0,
            last_health_check_time: None,
            last_health_check_model: None,
            not_supported_models: Vec::new(),
            check_health: false,
            check_model_name: None,
        }
    }

    /// Selection predicate: healthy, enabled, and not excluded for `model`.
    pub fn is_selectable(&self, model: Option<&str>) -> bool {
        if !self.is_healthy || self.is_disabled {
            return false;
        }
        match model {
            Some(model) => !self.not_supported_models.iter().any(|m| m == model),
            None => true,
        }
    }
}

/// Runtime knobs for the pool manager.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Consecutive errors before an account is marked unhealthy.
    pub max_error_count: u32,
    /// Cooldown before an unhealthy account is re-probed.
    pub health_check_interval: Duration,
    /// Quiet period before pending pool mutations are flushed to disk.
    pub save_debounce: Duration,
    /// Timeout for a single health probe, independent of request timeouts.
    pub probe_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_error_count: 3,
            health_check_interval: Duration::from_secs(600),
            save_debounce: Duration::from_millis(1000),
            probe_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_entry_deserializes_with_defaults() {
        let config: ProviderConfig = serde_json::from_str(
            "{\"uuid\":\"6f2c0ea8-3c12-4a6b-9c7e-0d4a5b6c7d8e\",\"credential\":{\"apiKey\":\"k\"}}",
        )
        .unwrap();
        assert!(config.is_healthy);
        assert!(!config.is_disabled);
        assert!(!config.check_health);
        assert_eq!(config.error_count, 0);
        assert_eq!(config.credential["apiKey"], "k");
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let mut config = ProviderConfig::new(Uuid::nil());
        config.last_used = Some(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let json = serde_json::to_value(&config).unwrap();
        let last_used = json["lastUsed"].as_str().unwrap();
        assert!(last_used.starts_with("2023-11-14T"));
    }

    #[test]
    fn model_exclusion_applies_only_to_listed_models() {
        let mut config = ProviderConfig::new(Uuid::nil());
        config.not_supported_models = vec!["gemini-2.5-pro".to_string()];
        assert!(!config.is_selectable(Some("gemini-2.5-pro")));
        assert!(config.is_selectable(Some("gemini-2.5-flash")));
        assert!(config.is_selectable(None));
    }
}
