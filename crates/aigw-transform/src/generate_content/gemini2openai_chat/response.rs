use aigw_protocol::gemini::generate_content::GenerateContentResponse;
use aigw_protocol::gemini::types::{
    FinishReason as GeminiFinishReason, KnownFinishReason as GeminiKnownFinishReason,
    UsageMetadata,
};
use aigw_protocol::openai::chat_completions::response::{
    ChatChoice, ChatCompletionObjectType, ChatCompletionResponse, ResponseMessage, ResponseRole,
};
use aigw_protocol::openai::chat_completions::types::{
    CompletionTokensDetails, FinishReason, FunctionCall, KnownFinishReason, ToolCall,
    ToolCallType, Usage,
};

use crate::dispatch::now_unix;

/// Convert a Gemini generateContent response into an OpenAI chat-completions
/// response. `model` backfills the model field Gemini responses omit.
pub fn transform_response(response: GenerateContentResponse, model: &str) -> ChatCompletionResponse {
    let mut texts: Vec<String> = Vec::new();
    let mut reasoning: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let mut finish_reason = None;
    let mut synth_counter = 0usize;

    if let Some(candidate) = response.candidates.into_iter().next() {
        if let Some(content) = candidate.content {
            for part in content.parts {
                if let Some(text) = part.text {
                    if text.is_empty() {
                        continue;
                    }
                    if part.thought == Some(true) {
                        reasoning.push(text);
                    } else {
                        texts.push(text);
                    }
                } else if let Some(call) = part.function_call {
                    let id = call.id.unwrap_or_else(|| {
                        let id = format!("call_{synth_counter:03}");
                        synth_counter += 1;
                        id
                    });
                    tool_calls.push(ToolCall {
                        id,
                        r#type: ToolCallType::Function,
                        function: FunctionCall {
                            name: call.name,
                            arguments: call
                                .args
                                .map(|args| args.to_string())
                                .unwrap_or_else(|| "{}".to_string()),
                        },
                    });
                }
            }
        }
        finish_reason = candidate
            .finish_reason
            .map(|reason| map_finish_reason(reason, !tool_calls.is_empty()));
    } else {
        tracing::warn!("gemini response carried no candidates");
    }

    let message = ResponseMessage {
        role: ResponseRole::Assistant,
        content: if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        },
        reasoning_content: if reasoning.is_empty() {
            None
        } else {
            Some(reasoning.join("\n"))
        },
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
    };

    ChatCompletionResponse {
        id: response
            .response_id
            .unwrap_or_else(|| "chatcmpl-gateway".to_string()),
        object: ChatCompletionObjectType::ChatCompletion,
        created: now_unix(),
        model: response.model_version.unwrap_or_else(|| model.to_string()),
        choices: vec![ChatChoice {
            index: 0,
            message,
            finish_reason,
        }],
        usage: response.usage_metadata.as_ref().map(map_usage),
    }
}

pub(crate) fn map_finish_reason(
    reason: GeminiFinishReason,
    saw_function_call: bool,
) -> FinishReason {
    match reason {
        GeminiFinishReason::Known(known) => match known {
            GeminiKnownFinishReason::Stop => {
                if saw_function_call {
                    FinishReason::tool_calls()
                } else {
                    FinishReason::stop()
                }
            }
            GeminiKnownFinishReason::MaxTokens => FinishReason::length(),
            GeminiKnownFinishReason::Safety | GeminiKnownFinishReason::Recitation => {
                FinishReason::Known(KnownFinishReason::ContentFilter)
            }
            GeminiKnownFinishReason::MalformedFunctionCall => {
                FinishReason::Other("malformed_function_call".to_string())
            }
            GeminiKnownFinishReason::Other => FinishReason::stop(),
        },
        GeminiFinishReason::Other(other) => FinishReason::Other(other),
    }
}

pub(crate) fn map_usage(usage: &UsageMetadata) -> Usage {
    let prompt = usage.prompt_token_count.unwrap_or(0);
    let completion = usage.candidates_token_count.unwrap_or(0);
    Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: usage.total_token_count.unwrap_or(prompt + completion),
        prompt_tokens_details: None,
        completion_tokens_details: usage.thoughts_token_count.map(|tokens| {
            CompletionTokensDetails {
                reasoning_tokens: Some(tokens),
            }
        }),
    }
}
