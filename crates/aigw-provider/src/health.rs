use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;

use aigw_protocol::claude::messages::MessagesRequest;
use aigw_protocol::claude::types::{MessageContent, MessageParam, MessageRole};
use aigw_protocol::gemini::generate_content::GenerateContentRequest;
use aigw_protocol::gemini::types::{Content, ContentRole, Part};
use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::types::{RequestMessage, UserContent};
use aigw_protocol::openai::responses::request::{InputParam, ResponseRequest};
use aigw_transform::Proto;

use crate::backend::BackendCaller;
use crate::catalog::{default_check_model, is_dual_format, protocol_family};
use crate::config::ProviderConfig;

const PROBE_TEXT: &str = "Hi";

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub success: bool,
    pub model: String,
    pub error_message: Option<String>,
}

/// Drives minimal synthetic requests through the normal backend call path
/// to verify reachability and credential validity.
pub struct HealthChecker {
    caller: Arc<dyn BackendCaller>,
    /// Probe timeout, independent of any live-request timeout: probes run
    /// on a background schedule, not a request path.
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(caller: Arc<dyn BackendCaller>, timeout: Duration) -> Self {
        Self { caller, timeout }
    }

    /// Ordered candidate probe bodies for one provider type. The list is
    /// tried front to back; the first body the backend accepts wins.
    pub fn build_health_check_requests(provider_type: &str, model: &str) -> Vec<JsonValue> {
        if is_dual_format(provider_type) {
            return vec![chat_probe(model), gemini_probe()];
        }
        match protocol_family(provider_type) {
            Some(Proto::Gemini) => vec![gemini_probe()],
            Some(Proto::OpenAIResponse) => vec![responses_probe(model)],
            Some(Proto::Claude) => vec![claude_probe(model)],
            Some(Proto::OpenAIChat) | None => vec![chat_probe(model)],
        }
    }

    /// Probe one account. `None` means the account has not opted into
    /// health checking (and `force` is off): treat as healthy-by-default.
    pub async fn check_provider_health(
        &self,
        provider_type: &str,
        config: &ProviderConfig,
        force: bool,
    ) -> Option<ProbeReport> {
        if !config.check_health && !force {
            return None;
        }

        let model = match config
            .check_model_name
            .clone()
            .or_else(|| default_check_model(provider_type).map(str::to_string))
        {
            Some(model) => model,
            None => {
                // Unknown type: an explicit failure, not healthy-by-default.
                return Some(ProbeReport {
                    success: false,
                    model: String::new(),
                    error_message: Some(format!(
                        "no default health-check model for provider type {provider_type}"
                    )),
                });
            }
        };

        let mut last_error = None;
        for body in Self::build_health_check_requests(provider_type, &model) {
            match tokio::time::timeout(
                self.timeout,
                self.caller.generate(provider_type, config, &model, body),
            )
            .await
            {
                Ok(Ok(_)) => {
                    return Some(ProbeReport {
                        success: true,
                        model,
                        error_message: None,
                    });
                }
                Ok(Err(err)) => last_error = Some(err.to_string()),
                Err(_) => last_error = Some("health probe timed out".to_string()),
            }
        }

        Some(ProbeReport {
            success: false,
            model,
            error_message: last_error,
        })
    }
}

fn chat_probe(model: &str) -> JsonValue {
    let request = ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![RequestMessage::User {
            content: UserContent::Text(PROBE_TEXT.to_string()),
            name: None,
        }],
        max_tokens: None,
        max_completion_tokens: Some(1),
        temperature: None,
        top_p: None,
        stop: None,
        stream: None,
        tools: None,
        tool_choice: None,
        parallel_tool_calls: None,
        reasoning_effort: None,
        user: None,
    };
    serde_json::to_value(request).unwrap_or(JsonValue::Null)
}

fn claude_probe(model: &str) -> JsonValue {
    let request = MessagesRequest {
        model: model.to_string(),
        max_tokens: 1,
        messages: vec![MessageParam {
            role: MessageRole::User,
            content: MessageContent::Text(PROBE_TEXT.to_string()),
        }],
        system: None,
        metadata: None,
        stop_sequences: None,
        stream: None,
        temperature: None,
        thinking: None,
        tool_choice: None,
        tools: None,
        top_k: None,
        top_p: None,
    };
    serde_json::to_value(request).unwrap_or(JsonValue::Null)
}

fn gemini_probe() -> JsonValue {
    let request = GenerateContentRequest {
        contents: vec![Content {
            role: Some(ContentRole::User),
            parts: vec![Part::text(PROBE_TEXT)],
        }],
        system_instruction: None,
        tools: None,
        tool_config: None,
        generation_config: None,
    };
    serde_json::to_value(request).unwrap_or(JsonValue::Null)
}

fn responses_probe(model: &str) -> JsonValue {
    let request = ResponseRequest {
        model: model.to_string(),
        input: InputParam::Text(PROBE_TEXT.to_string()),
        instructions: None,
        max_output_tokens: Some(1),
        temperature: None,
        top_p: None,
        stream: None,
        tools: None,
        tool_choice: None,
        parallel_tool_calls: None,
        reasoning: None,
        store: Some(false),
    };
    serde_json::to_value(request).unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_shapes_follow_protocol_family() {
        let gemini = HealthChecker::build_health_check_requests("gemini-cli-oauth", "m");
        assert_eq!(gemini.len(), 1);
        assert!(gemini[0].get("contents").is_some());

        let chat = HealthChecker::build_health_check_requests("openai-qwen-oauth", "m");
        assert_eq!(chat.len(), 1);
        assert!(chat[0].get("messages").is_some());

        let responses = HealthChecker::build_health_check_requests("openai-responses", "m");
        assert_eq!(responses.len(), 1);
        assert!(responses[0].get("input").is_some());

        let claude = HealthChecker::build_health_check_requests("claude-kiro-oauth", "m");
        assert_eq!(claude.len(), 1);
        assert!(claude[0].get("messages").is_some());
        assert!(claude[0].get("max_tokens").is_some());
    }

    #[test]
    fn dual_format_backends_probe_chat_then_contents() {
        let probes = HealthChecker::build_health_check_requests("openai-iflow", "m");
        assert_eq!(probes.len(), 2);
        assert!(probes[0].get("messages").is_some());
        assert!(probes[1].get("contents").is_some());
    }
}
