use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Effective outbound-call configuration after merging all layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Outbound request timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,
    /// Rewrites the outbound model field when set (model-fallback mapping).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

/// One merge layer. Precedence is fixed by overlay order:
/// global default, then provider-pool entry, then request-time overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

impl CallConfigPatch {
    /// Later layer wins field by field; headers merge key-wise with the
    /// later layer overriding colliding keys.
    pub fn overlay(&mut self, other: CallConfigPatch) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.timeout_ms.is_some() {
            self.timeout_ms = other.timeout_ms;
        }
        for (key, value) in other.extra_headers {
            self.extra_headers.insert(key, value);
        }
        if other.model_override.is_some() {
            self.model_override = other.model_override;
        }
    }

    pub fn into_config(self) -> CallConfig {
        CallConfig {
            base_url: self.base_url,
            proxy: self.proxy,
            timeout_ms: self.timeout_ms,
            extra_headers: self.extra_headers,
            model_override: self.model_override,
        }
    }
}

/// Merge the three layers in precedence order:
/// request-time > provider-pool entry > global default.
pub fn merge_call_config(
    global: CallConfigPatch,
    provider: CallConfigPatch,
    request: CallConfigPatch,
) -> CallConfig {
    let mut merged = global;
    merged.overlay(provider);
    merged.overlay(request);
    merged.into_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(base_url: Option<&str>, timeout_ms: Option<u64>) -> CallConfigPatch {
        CallConfigPatch {
            base_url: base_url.map(str::to_string),
            timeout_ms,
            ..CallConfigPatch::default()
        }
    }

    #[test]
    fn request_layer_wins_over_provider_and_global() {
        let merged = merge_call_config(
            patch(Some("https://global.example"), Some(30_000)),
            patch(Some("https://pool.example"), None),
            patch(None, Some(5_000)),
        );
        assert_eq!(merged.base_url.as_deref(), Some("https://pool.example"));
        assert_eq!(merged.timeout_ms, Some(5_000));
    }

    #[test]
    fn header_maps_merge_keywise() {
        let mut global = CallConfigPatch::default();
        global
            .extra_headers
            .insert("x-a".to_string(), "global".to_string());
        global
            .extra_headers
            .insert("x-b".to_string(), "global".to_string());
        let mut request = CallConfigPatch::default();
        request
            .extra_headers
            .insert("x-b".to_string(), "request".to_string());

        let merged = merge_call_config(global, CallConfigPatch::default(), request);
        assert_eq!(merged.extra_headers["x-a"], "global");
        assert_eq!(merged.extra_headers["x-b"], "request");
    }
}
