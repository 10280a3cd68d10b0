use aigw_protocol::claude::messages::MessagesResponse;
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, KnownStopReason, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::openai::chat_completions::response::{
    ChatChoice, ChatCompletionObjectType, ChatCompletionResponse, ResponseMessage, ResponseRole,
};
use aigw_protocol::openai::chat_completions::types::{
    FinishReason, FunctionCall, KnownFinishReason, ToolCall, ToolCallType, Usage,
};

use crate::dispatch::now_unix;

/// Convert a Claude messages response into an OpenAI chat-completions response.
pub fn transform_response(response: MessagesResponse) -> ChatCompletionResponse {
    let mut texts: Vec<String> = Vec::new();
    let mut reasoning: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    for block in &response.content {
        match block {
            ClaudeBlock::Text { text } => texts.push(text.clone()),
            ClaudeBlock::Thinking { thinking, .. } => reasoning.push(thinking.clone()),
            ClaudeBlock::RedactedThinking { .. } => {}
            ClaudeBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id: id.clone(),
                r#type: ToolCallType::Function,
                function: FunctionCall {
                    name: name.clone(),
                    arguments: serde_json::to_string(input).unwrap_or_else(|_| "{}".to_string()),
                },
            }),
            other => {
                tracing::warn!(?other, "skipping response block with no chat-completions equivalent");
            }
        }
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
        id: response.id,
        object: ChatCompletionObjectType::ChatCompletion,
        created: now_unix(),
        model: response.model,
        choices: vec![ChatChoice {
            index: 0,
            message,
            finish_reason: response.stop_reason.map(map_stop_reason),
        }],
        usage: Some(map_usage(&response.usage)),
    }
}

pub(crate) fn map_stop_reason(reason: StopReason) -> FinishReason {
    match reason {
        StopReason::Known(known) => FinishReason::Known(match known {
            KnownStopReason::EndTurn | KnownStopReason::StopSequence | KnownStopReason::PauseTurn => {
                KnownFinishReason::Stop
            }
            KnownStopReason::MaxTokens => KnownFinishReason::Length,
            KnownStopReason::ToolUse => KnownFinishReason::ToolCalls,
            KnownStopReason::Refusal => KnownFinishReason::ContentFilter,
        }),
        StopReason::Other(other) => FinishReason::Other(other),
    }
}

pub(crate) fn map_usage(usage: &ClaudeUsage) -> Usage {
    let prompt = usage.input_tokens.unwrap_or(0) as i64;
    let completion = usage.output_tokens.unwrap_or(0) as i64;
    Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt + completion,
        prompt_tokens_details: None,
        completion_tokens_details: None,
    }
}
