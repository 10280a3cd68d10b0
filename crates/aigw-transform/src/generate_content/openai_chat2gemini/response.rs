use aigw_protocol::gemini::generate_content::{Candidate, GenerateContentResponse};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FinishReason as GeminiFinishReason, FunctionCall,
    KnownFinishReason as GeminiKnownFinishReason, Part, UsageMetadata,
};
use aigw_protocol::openai::chat_completions::response::ChatCompletionResponse;
use aigw_protocol::openai::chat_completions::types::{
    FinishReason, KnownFinishReason, Usage as OpenAIUsage,
};
use serde_json::json;

/// Convert an OpenAI chat-completions response into a Gemini generateContent
/// response.
pub fn transform_response(response: ChatCompletionResponse) -> GenerateContentResponse {
    let mut parts = Vec::new();
    let mut finish_reason = None;

    if let Some(choice) = response.choices.into_iter().next() {
        if let Some(reasoning) = choice.message.reasoning_content
            && !reasoning.is_empty()
        {
            parts.push(Part::thought_text(reasoning));
        }
        if let Some(text) = choice.message.content
            && !text.is_empty()
        {
            parts.push(Part::text(text));
        }
        if let Some(tool_calls) = choice.message.tool_calls {
            for tool_call in tool_calls {
                let args =
                    serde_json::from_str(&tool_call.function.arguments).unwrap_or_else(|_| {
                        tracing::warn!(
                            tool = %tool_call.function.name,
                            "tool call arguments were not valid JSON; substituting empty args"
                        );
                        json!({})
                    });
                parts.push(Part::function_call(FunctionCall {
                    id: Some(tool_call.id),
                    name: tool_call.function.name,
                    args: Some(args),
                }));
            }
        }
        finish_reason = choice.finish_reason.map(map_finish_reason);
    } else {
        tracing::warn!("chat-completions response carried no choices");
    }

    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some(ContentRole::Model),
                parts,
            }),
            finish_reason,
            index: Some(0),
        }],
        usage_metadata: response.usage.as_ref().map(map_usage),
        model_version: Some(response.model),
        response_id: Some(response.id),
    }
}

pub(crate) fn map_finish_reason(reason: FinishReason) -> GeminiFinishReason {
    match reason {
        FinishReason::Known(known) => GeminiFinishReason::Known(match known {
            // Gemini has no distinct tool-calls terminal state.
            KnownFinishReason::Stop
            | KnownFinishReason::ToolCalls
            | KnownFinishReason::FunctionCall => GeminiKnownFinishReason::Stop,
            KnownFinishReason::Length => GeminiKnownFinishReason::MaxTokens,
            KnownFinishReason::ContentFilter => GeminiKnownFinishReason::Safety,
        }),
        FinishReason::Other(other) => GeminiFinishReason::Other(other),
    }
}

pub(crate) fn map_usage(usage: &OpenAIUsage) -> UsageMetadata {
    UsageMetadata {
        prompt_token_count: Some(usage.prompt_tokens),
        candidates_token_count: Some(usage.completion_tokens),
        thoughts_token_count: usage
            .completion_tokens_details
            .as_ref()
            .and_then(|details| details.reasoning_tokens),
        total_token_count: Some(usage.total_tokens),
    }
}
