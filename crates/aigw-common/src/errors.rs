use serde::{Deserialize, Serialize};

/// Stable machine code attached to every user-visible gateway failure.
///
/// Clients speaking any of the supported dialects render these into their
/// native error envelope; the code must never change meaning across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NoProviderAvailable,
    UnsupportedProtocol,
    InvalidRequest,
    Persistence,
    Backend,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoProviderAvailable => "no_provider_available",
            ErrorCode::UnsupportedProtocol => "unsupported_protocol",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::Persistence => "persistence",
            ErrorCode::Backend => "backend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{}: {message}", code.as_str())]
pub struct GatewayError {
    pub code: ErrorCode,
    pub message: String,
}

impl GatewayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_provider(provider_type: &str, model: Option<&str>) -> Self {
        let message = match model {
            Some(model) => format!(
                "no healthy provider available for type {provider_type} and model {model}"
            ),
            None => format!("no healthy provider available for type {provider_type}"),
        };
        Self::new(ErrorCode::NoProviderAvailable, message)
    }

    pub fn unsupported_protocol(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedProtocol, detail)
    }

    pub fn backend(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Backend, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable_strings() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::NoProviderAvailable).unwrap(),
            "\"no_provider_available\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::UnsupportedProtocol).unwrap(),
            "\"unsupported_protocol\""
        );
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = GatewayError::no_provider("gemini-cli-oauth", Some("gemini-2.5-pro"));
        let text = err.to_string();
        assert!(text.starts_with("no_provider_available:"));
        assert!(text.contains("gemini-2.5-pro"));
    }
}
