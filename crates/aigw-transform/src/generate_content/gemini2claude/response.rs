use aigw_protocol::claude::messages::{MessageType, MessagesResponse};
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, KnownStopReason, MessageRole, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::gemini::generate_content::GenerateContentResponse;
use aigw_protocol::gemini::types::{
    FinishReason as GeminiFinishReason, KnownFinishReason as GeminiKnownFinishReason,
    UsageMetadata,
};
use serde_json::json;

/// Convert a Gemini generateContent response into a Claude messages
/// response. `model` backfills the model field Gemini responses omit.
pub fn transform_response(response: GenerateContentResponse, model: &str) -> MessagesResponse {
    let mut content = Vec::new();
    let mut stop_reason = None;
    let mut saw_function_call = false;
    let mut synth_counter = 0usize;

    if let Some(candidate) = response.candidates.into_iter().next() {
        if let Some(candidate_content) = candidate.content {
            for part in candidate_content.parts {
                if let Some(text) = part.text {
                    if text.is_empty() {
                        continue;
                    }
                    if part.thought == Some(true) {
                        content.push(ClaudeBlock::Thinking {
                            thinking: text,
                            signature: part.thought_signature,
                        });
                    } else {
                        content.push(ClaudeBlock::Text { text });
                    }
                } else if let Some(call) = part.function_call {
                    saw_function_call = true;
                    let id = call.id.unwrap_or_else(|| {
                        let id = format!("toolu_{synth_counter:03}");
                        synth_counter += 1;
                        id
                    });
                    content.push(ClaudeBlock::ToolUse {
                        id,
                        name: call.name,
                        input: call.args.unwrap_or_else(|| json!({})),
                    });
                }
            }
        }
        stop_reason = candidate
            .finish_reason
            .map(|reason| map_finish_reason(reason, saw_function_call));
    } else {
        tracing::warn!("gemini response carried no candidates");
    }

    MessagesResponse {
        id: response
            .response_id
            .unwrap_or_else(|| "msg_gateway".to_string()),
        r#type: MessageType::Message,
        role: MessageRole::Assistant,
        content,
        model: response.model_version.unwrap_or_else(|| model.to_string()),
        stop_reason,
        stop_sequence: None,
        usage: response
            .usage_metadata
            .as_ref()
            .map(map_usage)
            .unwrap_or_default(),
    }
}

pub(crate) fn map_finish_reason(
    reason: GeminiFinishReason,
    saw_function_call: bool,
) -> StopReason {
    match reason {
        GeminiFinishReason::Known(known) => match known {
            GeminiKnownFinishReason::Stop => {
                if saw_function_call {
                    StopReason::Known(KnownStopReason::ToolUse)
                } else {
                    StopReason::Known(KnownStopReason::EndTurn)
                }
            }
            GeminiKnownFinishReason::MaxTokens => StopReason::Known(KnownStopReason::MaxTokens),
            GeminiKnownFinishReason::Safety | GeminiKnownFinishReason::Recitation => {
                StopReason::Known(KnownStopReason::Refusal)
            }
            GeminiKnownFinishReason::MalformedFunctionCall => {
                StopReason::Other("malformed_function_call".to_string())
            }
            GeminiKnownFinishReason::Other => StopReason::Known(KnownStopReason::EndTurn),
        },
        GeminiFinishReason::Other(other) => StopReason::Other(other),
    }
}

pub(crate) fn map_usage(usage: &UsageMetadata) -> ClaudeUsage {
    ClaudeUsage {
        input_tokens: usage.prompt_token_count.map(|count| count.max(0) as u64),
        output_tokens: usage
            .candidates_token_count
            .map(|count| count.max(0) as u64),
        cache_creation_input_tokens: None,
        cache_read_input_tokens: None,
    }
}
