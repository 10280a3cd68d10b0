use std::collections::HashSet;

use aigw_protocol::claude::messages::MessagesRequest;
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, ImageSource, MessageContent, MessageParam, MessageRole,
    ThinkingConfig, Tool as ClaudeTool, ToolChoice as ClaudeToolChoice, ToolResultBlock,
    ToolResultContent,
};
use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::types::{
    FunctionCall, FunctionDefinition, ImageUrl, NamedToolChoice, NamedToolChoiceFunction,
    ReasoningEffort, RequestMessage, StopConfiguration, TextContent, ToolCall, ToolCallType,
    ToolChoiceMode, ToolChoiceOption, ToolDefinition, UserContent, UserContentPart,
};

use crate::reasoning::budget_to_effort;

/// Convert a Claude messages request into an OpenAI chat-completions request.
pub fn transform_request(request: MessagesRequest) -> ChatCompletionRequest {
    // OpenAI requires every assistant tool call to pair with a later tool
    // message; collect result ids up front so dangling calls can be dropped.
    let result_ids = collect_tool_result_ids(&request.messages);

    let mut messages = Vec::new();
    if let Some(system) = request.system {
        let text = system.into_text();
        if !text.is_empty() {
            messages.push(RequestMessage::System {
                content: TextContent::Text(text),
                name: None,
            });
        }
    }
    for message in &request.messages {
        messages.extend(map_message(message, &result_ids));
    }

    let tools = map_tools(request.tools);
    let (tool_choice, parallel_tool_calls) = map_tool_choice(request.tool_choice);

    ChatCompletionRequest {
        model: request.model,
        messages,
        max_tokens: None,
        max_completion_tokens: Some(request.max_tokens as i64),
        temperature: request.temperature,
        top_p: request.top_p,
        stop: map_stop_sequences(request.stop_sequences),
        stream: request.stream,
        tools,
        tool_choice,
        parallel_tool_calls,
        reasoning_effort: request.thinking.map(map_thinking),
        user: None,
    }
}

fn collect_tool_result_ids(messages: &[MessageParam]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for message in messages {
        let MessageContent::Blocks(blocks) = &message.content else {
            continue;
        };
        for block in blocks {
            if let ClaudeBlock::ToolResult { tool_use_id, .. } = block {
                ids.insert(tool_use_id.clone());
            }
        }
    }
    ids
}

fn map_message(message: &MessageParam, result_ids: &HashSet<String>) -> Vec<RequestMessage> {
    match message.role {
        MessageRole::User => map_user_message(&message.content),
        MessageRole::Assistant => map_assistant_message(&message.content, result_ids),
    }
}

fn map_user_message(content: &MessageContent) -> Vec<RequestMessage> {
    let mut output = Vec::new();
    let mut parts: Vec<UserContentPart> = Vec::new();

    match content {
        MessageContent::Text(text) => push_user_text(&mut parts, text.clone()),
        MessageContent::Blocks(blocks) => {
            for block in blocks {
                match block {
                    ClaudeBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => {
                        // Tool results become standalone tool-role messages.
                        flush_user_parts(&mut output, &mut parts);
                        output.push(RequestMessage::Tool {
                            content: TextContent::Text(tool_result_text(content.as_ref())),
                            tool_call_id: tool_use_id.clone(),
                        });
                    }
                    ClaudeBlock::Text { text } => push_user_text(&mut parts, text.clone()),
                    ClaudeBlock::Image { source } => parts.push(map_image_part(source)),
                    other => {
                        tracing::warn!(block = ?block_kind(other), "skipping user block with no chat-completions equivalent");
                    }
                }
            }
        }
    }

    flush_user_parts(&mut output, &mut parts);
    output
}

fn map_assistant_message(
    content: &MessageContent,
    result_ids: &HashSet<String>,
) -> Vec<RequestMessage> {
    let mut texts: Vec<String> = Vec::new();
    let mut reasoning: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    match content {
        MessageContent::Text(text) => texts.push(text.clone()),
        MessageContent::Blocks(blocks) => {
            for block in blocks {
                match block {
                    ClaudeBlock::Text { text } => texts.push(text.clone()),
                    ClaudeBlock::Thinking { thinking, .. } => reasoning.push(thinking.clone()),
                    ClaudeBlock::RedactedThinking { .. } => {}
                    ClaudeBlock::ToolUse { id, name, input } => {
                        if result_ids.contains(id) {
                            tool_calls.push(ToolCall {
                                id: id.clone(),
                                r#type: ToolCallType::Function,
                                function: FunctionCall {
                                    name: name.clone(),
                                    arguments: serde_json::to_string(input)
                                        .unwrap_or_else(|_| "{}".to_string()),
                                },
                            });
                        } else {
                            tracing::warn!(tool_use_id = %id, "dropping assistant tool call with no paired result");
                        }
                    }
                    other => {
                        tracing::warn!(block = ?block_kind(other), "skipping assistant block with no chat-completions equivalent");
                    }
                }
            }
        }
    }

    let content = if texts.is_empty() {
        None
    } else {
        Some(TextContent::Text(texts.join("\n")))
    };
    let reasoning_content = if reasoning.is_empty() {
        None
    } else {
        Some(reasoning.join("\n"))
    };
    let tool_calls = if tool_calls.is_empty() {
        None
    } else {
        Some(tool_calls)
    };

    if content.is_none() && reasoning_content.is_none() && tool_calls.is_none() {
        return Vec::new();
    }

    vec![RequestMessage::Assistant {
        content,
        reasoning_content,
        tool_calls,
        name: None,
    }]
}

fn push_user_text(parts: &mut Vec<UserContentPart>, text: String) {
    if !text.is_empty() {
        parts.push(UserContentPart::Text { text });
    }
}

fn flush_user_parts(output: &mut Vec<RequestMessage>, parts: &mut Vec<UserContentPart>) {
    if parts.is_empty() {
        return;
    }
    let content = if parts.len() == 1 {
        match &parts[0] {
            UserContentPart::Text { text } => UserContent::Text(text.clone()),
            _ => UserContent::Parts(parts.clone()),
        }
    } else {
        UserContent::Parts(parts.clone())
    };
    output.push(RequestMessage::User {
        content,
        name: None,
    });
    parts.clear();
}

fn map_image_part(source: &ImageSource) -> UserContentPart {
    let url = match source {
        ImageSource::Url { url } => url.clone(),
        ImageSource::Base64 { media_type, data } => {
            format!("data:{media_type};base64,{data}")
        }
    };
    UserContentPart::ImageUrl {
        image_url: ImageUrl { url, detail: None },
    }
}

fn tool_result_text(content: Option<&ToolResultContent>) -> String {
    match content {
        Some(ToolResultContent::Text(text)) => text.clone(),
        Some(ToolResultContent::Blocks(blocks)) => blocks
            .iter()
            .map(|block| match block {
                ToolResultBlock::Text { text } => text.clone(),
                ToolResultBlock::Image { .. } => "[tool_result image]".to_string(),
            })
            .collect::<Vec<String>>()
            .join("\n"),
        None => String::new(),
    }
}

fn map_tools(tools: Option<Vec<ClaudeTool>>) -> Option<Vec<ToolDefinition>> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .into_iter()
            .map(|tool| ToolDefinition::Function {
                function: FunctionDefinition {
                    name: tool.name,
                    description: tool.description,
                    parameters: Some(tool.input_schema),
                    strict: None,
                },
            })
            .collect(),
    )
}

fn map_tool_choice(
    choice: Option<ClaudeToolChoice>,
) -> (Option<ToolChoiceOption>, Option<bool>) {
    match choice {
        None => (None, None),
        Some(ClaudeToolChoice::Auto {
            disable_parallel_tool_use,
        }) => (
            Some(ToolChoiceOption::Mode(ToolChoiceMode::Auto)),
            disable_parallel_tool_use.map(|disabled| !disabled),
        ),
        Some(ClaudeToolChoice::Any {
            disable_parallel_tool_use,
        }) => (
            Some(ToolChoiceOption::Mode(ToolChoiceMode::Required)),
            disable_parallel_tool_use.map(|disabled| !disabled),
        ),
        Some(ClaudeToolChoice::Tool {
            name,
            disable_parallel_tool_use,
        }) => (
            Some(ToolChoiceOption::Named(NamedToolChoice {
                r#type: ToolCallType::Function,
                function: NamedToolChoiceFunction { name },
            })),
            disable_parallel_tool_use.map(|disabled| !disabled),
        ),
        Some(ClaudeToolChoice::None) => {
            (Some(ToolChoiceOption::Mode(ToolChoiceMode::None)), None)
        }
    }
}

fn map_thinking(thinking: ThinkingConfig) -> ReasoningEffort {
    match thinking {
        ThinkingConfig::Enabled { budget_tokens } => budget_to_effort(budget_tokens as i32),
        ThinkingConfig::Disabled => ReasoningEffort::None,
    }
}

fn map_stop_sequences(sequences: Option<Vec<String>>) -> Option<StopConfiguration> {
    let sequences = sequences?;
    match sequences.len() {
        0 => None,
        1 => Some(StopConfiguration::Single(sequences.into_iter().next()?)),
        _ => Some(StopConfiguration::Many(sequences)),
    }
}

fn block_kind(block: &ClaudeBlock) -> &'static str {
    match block {
        ClaudeBlock::Text { .. } => "text",
        ClaudeBlock::Thinking { .. } => "thinking",
        ClaudeBlock::RedactedThinking { .. } => "redacted_thinking",
        ClaudeBlock::Image { .. } => "image",
        ClaudeBlock::ToolUse { .. } => "tool_use",
        ClaudeBlock::ToolResult { .. } => "tool_result",
    }
}
