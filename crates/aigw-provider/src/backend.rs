use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::config::ProviderConfig;

pub type ByteStream = tokio::sync::mpsc::Receiver<Bytes>;

/// Upstream call failure with the raw message preserved for operators.
#[derive(Debug, Clone)]
pub struct BackendError {
    /// HTTP status when the upstream answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "backend call failed ({status}): {}", self.message),
            None => write!(f, "backend call failed: {}", self.message),
        }
    }
}

impl std::error::Error for BackendError {}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// The IO seam the HTTP layer implements per provider type.
///
/// The pool manager and health checker dispatch through this trait for
/// real traffic and probes alike; credential material travels inside the
/// `ProviderConfig` untouched.
#[async_trait]
pub trait BackendCaller: Send + Sync {
    async fn generate(
        &self,
        provider_type: &str,
        config: &ProviderConfig,
        model: &str,
        body: JsonValue,
    ) -> Result<JsonValue, BackendError>;

    async fn generate_stream(
        &self,
        provider_type: &str,
        config: &ProviderConfig,
        model: &str,
        body: JsonValue,
    ) -> Result<ByteStream, BackendError>;
}
