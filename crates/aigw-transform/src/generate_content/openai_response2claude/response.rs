use aigw_protocol::claude::messages::{MessageType, MessagesResponse};
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, KnownStopReason, MessageRole, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::openai::responses::response::Response;
use aigw_protocol::openai::responses::types::{
    KnownResponseStatus, OutputContent, OutputItem, ResponseStatus, ResponseUsage,
};
use serde_json::json;

/// Convert an OpenAI Responses response into a Claude messages response.
pub fn transform_response(response: Response) -> MessagesResponse {
    let mut content = Vec::new();
    let mut saw_function_call = false;

    for item in &response.output {
        match item {
            OutputItem::Reasoning { summary, .. } => {
                let text = summary
                    .iter()
                    .map(|part| part.text.clone())
                    .collect::<Vec<String>>()
                    .join("\n");
                if !text.is_empty() {
                    content.push(ClaudeBlock::Thinking {
                        thinking: text,
                        signature: None,
                    });
                }
            }
            OutputItem::Message { content: parts, .. } => {
                for part in parts {
                    match part {
                        OutputContent::OutputText { text, .. } => {
                            if !text.is_empty() {
                                content.push(ClaudeBlock::Text { text: text.clone() });
                            }
                        }
                        OutputContent::Refusal { refusal } => {
                            if !refusal.is_empty() {
                                content.push(ClaudeBlock::Text {
                                    text: refusal.clone(),
                                });
                            }
                        }
                    }
                }
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
                ..
            } => {
                saw_function_call = true;
                let input = serde_json::from_str(arguments).unwrap_or_else(|_| {
                    tracing::warn!(tool = %name, "tool call arguments were not valid JSON; substituting empty args");
                    json!({})
                });
                content.push(ClaudeBlock::ToolUse {
                    id: call_id.clone(),
                    name: name.clone(),
                    input,
                });
            }
        }
    }

    MessagesResponse {
        id: response.id,
        r#type: MessageType::Message,
        role: MessageRole::Assistant,
        content,
        model: response.model,
        stop_reason: Some(map_status(&response.status, saw_function_call)),
        stop_sequence: None,
        usage: response
            .usage
            .as_ref()
            .map(map_usage)
            .unwrap_or_default(),
    }
}

pub(crate) fn map_status(status: &ResponseStatus, saw_function_call: bool) -> StopReason {
    match status {
        ResponseStatus::Known(known) => match known {
            KnownResponseStatus::Completed | KnownResponseStatus::InProgress => {
                if saw_function_call {
                    StopReason::Known(KnownStopReason::ToolUse)
                } else {
                    StopReason::Known(KnownStopReason::EndTurn)
                }
            }
            KnownResponseStatus::Incomplete => StopReason::Known(KnownStopReason::MaxTokens),
            KnownResponseStatus::Failed => StopReason::Other("failed".to_string()),
            KnownResponseStatus::Cancelled => StopReason::Other("cancelled".to_string()),
        },
        ResponseStatus::Other(other) => StopReason::Other(other.clone()),
    }
}

pub(crate) fn map_usage(usage: &ResponseUsage) -> ClaudeUsage {
    ClaudeUsage {
        input_tokens: Some(usage.input_tokens.max(0) as u64),
        output_tokens: Some(usage.output_tokens.max(0) as u64),
        cache_creation_input_tokens: None,
        cache_read_input_tokens: None,
    }
}
