use aigw_protocol::claude::messages::{MessageType, MessagesResponse};
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, KnownStopReason, MessageRole, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::openai::chat_completions::response::ChatCompletionResponse;
use aigw_protocol::openai::chat_completions::types::{
    FinishReason, KnownFinishReason, Usage as OpenAIUsage,
};
use serde_json::json;

/// Convert an OpenAI chat-completions response into a Claude messages response.
pub fn transform_response(response: ChatCompletionResponse) -> MessagesResponse {
    let mut content = Vec::new();
    let mut stop_reason = None;

    if let Some(choice) = response.choices.into_iter().next() {
        if let Some(reasoning) = choice.message.reasoning_content
            && !reasoning.is_empty()
        {
            content.push(ClaudeBlock::Thinking {
                thinking: reasoning,
                signature: None,
            });
        }
        if let Some(text) = choice.message.content
            && !text.is_empty()
        {
            content.push(ClaudeBlock::Text { text });
        }
        if let Some(tool_calls) = choice.message.tool_calls {
            for tool_call in tool_calls {
                let input =
                    serde_json::from_str(&tool_call.function.arguments).unwrap_or_else(|_| {
                        tracing::warn!(
                            tool = %tool_call.function.name,
                            "tool call arguments were not valid JSON; substituting empty args"
                        );
                        json!({})
                    });
                content.push(ClaudeBlock::ToolUse {
                    id: tool_call.id,
                    name: tool_call.function.name,
                    input,
                });
            }
        }
        stop_reason = choice.finish_reason.map(map_finish_reason);
    } else {
        tracing::warn!("chat-completions response carried no choices");
    }

    MessagesResponse {
        id: response.id,
        r#type: MessageType::Message,
        role: MessageRole::Assistant,
        content,
        model: response.model,
        stop_reason,
        stop_sequence: None,
        usage: response
            .usage
            .as_ref()
            .map(map_usage)
            .unwrap_or_default(),
    }
}

pub(crate) fn map_finish_reason(reason: FinishReason) -> StopReason {
    match reason {
        FinishReason::Known(known) => StopReason::Known(match known {
            KnownFinishReason::Stop => KnownStopReason::EndTurn,
            KnownFinishReason::Length => KnownStopReason::MaxTokens,
            KnownFinishReason::ToolCalls | KnownFinishReason::FunctionCall => {
                KnownStopReason::ToolUse
            }
            KnownFinishReason::ContentFilter => KnownStopReason::Refusal,
        }),
        FinishReason::Other(other) => StopReason::Other(other),
    }
}

pub(crate) fn map_usage(usage: &OpenAIUsage) -> ClaudeUsage {
    ClaudeUsage {
        input_tokens: Some(usage.prompt_tokens.max(0) as u64),
        output_tokens: Some(usage.completion_tokens.max(0) as u64),
        cache_creation_input_tokens: None,
        cache_read_input_tokens: usage
            .prompt_tokens_details
            .as_ref()
            .and_then(|details| details.cached_tokens)
            .map(|tokens| tokens.max(0) as u64),
    }
}
