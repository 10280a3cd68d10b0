use aigw_protocol::claude::messages::MessagesRequest;
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, ImageSource, MessageContent, MessageParam, MessageRole,
    SystemParam, ThinkingConfig, Tool as ClaudeTool, ToolChoice as ClaudeToolChoice,
    ToolResultContent,
};
use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::types::{
    ReasoningEffort, RequestMessage, StopConfiguration, TextContent, ToolCall, ToolChoiceMode,
    ToolChoiceOption, ToolDefinition, UserContent, UserContentPart,
};
use serde_json::json;

use crate::generate_content::util::{DEFAULT_CLAUDE_MAX_TOKENS, merge_adjacent_roles};
use crate::reasoning::effort_to_budget;

/// Convert an OpenAI chat-completions request into a Claude messages request.
pub fn transform_request(request: ChatCompletionRequest) -> MessagesRequest {
    let mut system_texts: Vec<String> = Vec::new();
    let mut messages: Vec<MessageParam> = Vec::new();

    for message in &request.messages {
        match message {
            RequestMessage::System { content, .. } | RequestMessage::Developer { content, .. } => {
                let text = content.clone().into_text();
                if !text.is_empty() {
                    system_texts.push(text);
                }
            }
            RequestMessage::User { content, .. } => {
                if let Some(message) = map_user_message(content) {
                    messages.push(message);
                }
            }
            RequestMessage::Assistant {
                content,
                tool_calls,
                ..
            } => {
                if let Some(message) = map_assistant_message(content.as_ref(), tool_calls.as_ref())
                {
                    messages.push(message);
                }
            }
            RequestMessage::Tool {
                content,
                tool_call_id,
            } => {
                messages.push(MessageParam {
                    role: MessageRole::User,
                    content: MessageContent::Blocks(vec![ClaudeBlock::ToolResult {
                        tool_use_id: tool_call_id.clone(),
                        content: Some(ToolResultContent::Text(content.clone().into_text())),
                        is_error: None,
                    }]),
                });
            }
        }
    }

    let messages = merge_adjacent_roles(messages);

    let system = if system_texts.is_empty() {
        None
    } else {
        Some(SystemParam::Text(system_texts.join("\n")))
    };

    let max_tokens = request
        .output_token_cap()
        .map(|cap| cap.max(1) as u32)
        .unwrap_or(DEFAULT_CLAUDE_MAX_TOKENS);

    MessagesRequest {
        model: request.model,
        max_tokens,
        messages,
        system,
        metadata: None,
        stop_sequences: map_stop(request.stop),
        stream: request.stream,
        temperature: request.temperature,
        thinking: request.reasoning_effort.and_then(map_reasoning),
        tool_choice: map_tool_choice(request.tool_choice, request.parallel_tool_calls),
        tools: map_tools(request.tools),
        top_k: None,
        top_p: request.top_p,
    }
}

fn map_user_message(content: &UserContent) -> Option<MessageParam> {
    let mut blocks = Vec::new();
    match content {
        UserContent::Text(text) => {
            if !text.is_empty() {
                blocks.push(ClaudeBlock::Text { text: text.clone() });
            }
        }
        UserContent::Parts(parts) => {
            for part in parts {
                match part {
                    UserContentPart::Text { text } => {
                        if !text.is_empty() {
                            blocks.push(ClaudeBlock::Text { text: text.clone() });
                        }
                    }
                    UserContentPart::ImageUrl { image_url } => {
                        blocks.push(ClaudeBlock::Image {
                            source: map_image_source(&image_url.url),
                        });
                    }
                }
            }
        }
    }

    if blocks.is_empty() {
        return None;
    }
    Some(MessageParam {
        role: MessageRole::User,
        content: crate::generate_content::util::content_from_blocks(blocks),
    })
}

fn map_assistant_message(
    content: Option<&TextContent>,
    tool_calls: Option<&Vec<ToolCall>>,
) -> Option<MessageParam> {
    let mut blocks = Vec::new();

    if let Some(content) = content {
        let text = content.clone().into_text();
        if !text.is_empty() {
            blocks.push(ClaudeBlock::Text { text });
        }
    }

    if let Some(tool_calls) = tool_calls {
        for tool_call in tool_calls {
            let input = serde_json::from_str(&tool_call.function.arguments).unwrap_or_else(|_| {
                tracing::warn!(
                    tool = %tool_call.function.name,
                    "tool call arguments were not valid JSON; substituting empty args"
                );
                json!({})
            });
            blocks.push(ClaudeBlock::ToolUse {
                id: tool_call.id.clone(),
                name: tool_call.function.name.clone(),
                input,
            });
        }
    }

    if blocks.is_empty() {
        return None;
    }
    Some(MessageParam {
        role: MessageRole::Assistant,
        content: crate::generate_content::util::content_from_blocks(blocks),
    })
}

fn map_image_source(url: &str) -> ImageSource {
    // data:<mime>;base64,<data> urls decompose into Claude's base64 source.
    if let Some(rest) = url.strip_prefix("data:")
        && let Some((media_type, data)) = rest.split_once(";base64,")
    {
        return ImageSource::Base64 {
            media_type: media_type.to_string(),
            data: data.to_string(),
        };
    }
    ImageSource::Url {
        url: url.to_string(),
    }
}

fn map_tools(tools: Option<Vec<ToolDefinition>>) -> Option<Vec<ClaudeTool>> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .into_iter()
            .map(|ToolDefinition::Function { function }| ClaudeTool {
                name: function.name,
                description: function.description,
                input_schema: function
                    .parameters
                    .unwrap_or_else(|| json!({ "type": "object" })),
            })
            .collect(),
    )
}

fn map_tool_choice(
    choice: Option<ToolChoiceOption>,
    parallel_tool_calls: Option<bool>,
) -> Option<ClaudeToolChoice> {
    let disable_parallel = parallel_tool_calls.map(|parallel| !parallel);
    match choice? {
        ToolChoiceOption::Mode(ToolChoiceMode::Auto) => Some(ClaudeToolChoice::Auto {
            disable_parallel_tool_use: disable_parallel,
        }),
        ToolChoiceOption::Mode(ToolChoiceMode::Required) => Some(ClaudeToolChoice::Any {
            disable_parallel_tool_use: disable_parallel,
        }),
        ToolChoiceOption::Mode(ToolChoiceMode::None) => Some(ClaudeToolChoice::None),
        ToolChoiceOption::Named(named) => Some(ClaudeToolChoice::Tool {
            name: named.function.name,
            disable_parallel_tool_use: disable_parallel,
        }),
    }
}

fn map_reasoning(effort: ReasoningEffort) -> Option<ThinkingConfig> {
    match effort {
        ReasoningEffort::None => Some(ThinkingConfig::Disabled),
        // Auto defers to the model's own default; omit the knob entirely.
        ReasoningEffort::Auto => None,
        effort => Some(ThinkingConfig::Enabled {
            budget_tokens: effort_to_budget(effort) as u32,
        }),
    }
}

fn map_stop(stop: Option<StopConfiguration>) -> Option<Vec<String>> {
    match stop? {
        StopConfiguration::Single(stop) => Some(vec![stop]),
        StopConfiguration::Many(stops) => {
            if stops.is_empty() {
                None
            } else {
                Some(stops)
            }
        }
    }
}
