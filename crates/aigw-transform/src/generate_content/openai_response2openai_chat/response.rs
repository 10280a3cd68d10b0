use aigw_protocol::openai::chat_completions::response::{
    ChatChoice, ChatCompletionObjectType, ChatCompletionResponse, ResponseMessage, ResponseRole,
};
use aigw_protocol::openai::chat_completions::types::{
    CompletionTokensDetails, FinishReason, FunctionCall, ToolCall, ToolCallType, Usage,
};
use aigw_protocol::openai::responses::response::Response;
use aigw_protocol::openai::responses::types::{
    KnownResponseStatus, OutputContent, OutputItem, ResponseStatus, ResponseUsage,
};

/// Convert an OpenAI Responses response into a chat-completions response.
pub fn transform_response(response: Response) -> ChatCompletionResponse {
    let mut texts: Vec<String> = Vec::new();
    let mut reasoning: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    for item in &response.output {
        match item {
            OutputItem::Message { content, .. } => {
                for part in content {
                    match part {
                        OutputContent::OutputText { text, .. } => texts.push(text.clone()),
                        OutputContent::Refusal { refusal } => texts.push(refusal.clone()),
                    }
                }
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
                ..
            } => tool_calls.push(ToolCall {
                id: call_id.clone(),
                r#type: ToolCallType::Function,
                function: FunctionCall {
                    name: name.clone(),
                    arguments: arguments.clone(),
                },
            }),
            OutputItem::Reasoning { summary, .. } => {
                for part in summary {
                    reasoning.push(part.text.clone());
                }
            }
        }
    }

    let finish_reason = map_status(&response.status, !tool_calls.is_empty());

    ChatCompletionResponse {
        id: response.id,
        object: ChatCompletionObjectType::ChatCompletion,
        created: response.created_at,
        model: response.model,
        choices: vec![ChatChoice {
            index: 0,
            message: ResponseMessage {
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
            },
            finish_reason: Some(finish_reason),
        }],
        usage: response.usage.as_ref().map(map_usage),
    }
}

pub(crate) fn map_status(status: &ResponseStatus, saw_function_call: bool) -> FinishReason {
    match status {
        ResponseStatus::Known(known) => match known {
            KnownResponseStatus::Completed | KnownResponseStatus::InProgress => {
                if saw_function_call {
                    FinishReason::tool_calls()
                } else {
                    FinishReason::stop()
                }
            }
            KnownResponseStatus::Incomplete => FinishReason::length(),
            KnownResponseStatus::Failed => FinishReason::Other("failed".to_string()),
            KnownResponseStatus::Cancelled => FinishReason::Other("cancelled".to_string()),
        },
        ResponseStatus::Other(other) => FinishReason::Other(other.clone()),
    }
}

pub(crate) fn map_usage(usage: &ResponseUsage) -> Usage {
    Usage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage.total_tokens,
        prompt_tokens_details: None,
        completion_tokens_details: usage
            .output_tokens_details
            .as_ref()
            .and_then(|details| details.reasoning_tokens)
            .map(|tokens| CompletionTokensDetails {
                reasoning_tokens: Some(tokens),
            }),
    }
}
