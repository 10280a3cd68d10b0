use aigw_protocol::claude::messages::MessagesRequest;
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, MessageContent, MessageParam, MessageRole,
    ThinkingConfig as ClaudeThinkingConfig, Tool as ClaudeTool, ToolResultBlock,
    ToolResultContent,
};
use aigw_protocol::openai::chat_completions::types::ReasoningEffort;
use aigw_protocol::openai::responses::request::{InputParam, ResponseRequest};
use aigw_protocol::openai::responses::types::{
    InputContentPart, InputItem, InputMessageContent, InputRole, ReasoningConfig, ToolDefinition,
};

use crate::reasoning::budget_to_effort;

/// Convert a Claude messages request into an OpenAI Responses request.
pub fn transform_request(request: MessagesRequest) -> ResponseRequest {
    let mut items = Vec::new();
    for message in &request.messages {
        items.extend(map_message(message));
    }

    ResponseRequest {
        model: request.model,
        input: InputParam::Items(items),
        instructions: request.system.and_then(|system| {
            let text = system.into_text();
            if text.is_empty() { None } else { Some(text) }
        }),
        max_output_tokens: Some(request.max_tokens as i64),
        temperature: request.temperature,
        top_p: request.top_p,
        stream: request.stream,
        tools: map_tools(request.tools),
        tool_choice: None,
        parallel_tool_calls: None,
        reasoning: request.thinking.map(map_thinking),
        store: Some(false),
    }
}

fn map_message(message: &MessageParam) -> Vec<InputItem> {
    let role = match message.role {
        MessageRole::User => InputRole::User,
        MessageRole::Assistant => InputRole::Assistant,
    };

    let mut items = Vec::new();
    let mut parts: Vec<InputContentPart> = Vec::new();

    let push_text = |parts: &mut Vec<InputContentPart>, text: String| {
        if text.is_empty() {
            return;
        }
        match role {
            InputRole::Assistant => parts.push(InputContentPart::OutputText { text }),
            _ => parts.push(InputContentPart::InputText { text }),
        }
    };

    match &message.content {
        MessageContent::Text(text) => push_text(&mut parts, text.clone()),
        MessageContent::Blocks(blocks) => {
            for block in blocks {
                match block {
                    ClaudeBlock::Text { text } => push_text(&mut parts, text.clone()),
                    ClaudeBlock::Thinking { .. } | ClaudeBlock::RedactedThinking { .. } => {}
                    ClaudeBlock::Image { source } => {
                        let url = match source {
                            aigw_protocol::claude::types::ImageSource::Url { url } => url.clone(),
                            aigw_protocol::claude::types::ImageSource::Base64 {
                                media_type,
                                data,
                            } => format!("data:{media_type};base64,{data}"),
                        };
                        parts.push(InputContentPart::InputImage {
                            image_url: Some(url),
                        });
                    }
                    ClaudeBlock::ToolUse { id, name, input } => {
                        flush_parts(&mut items, &mut parts, role);
                        items.push(InputItem::FunctionCall {
                            id: None,
                            call_id: id.clone(),
                            name: name.clone(),
                            arguments: serde_json::to_string(input)
                                .unwrap_or_else(|_| "{}".to_string()),
                        });
                    }
                    ClaudeBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => {
                        flush_parts(&mut items, &mut parts, role);
                        items.push(InputItem::FunctionCallOutput {
                            call_id: tool_use_id.clone(),
                            output: tool_result_text(content.as_ref()),
                        });
                    }
                }
            }
        }
    }

    flush_parts(&mut items, &mut parts, role);
    items
}

fn flush_parts(items: &mut Vec<InputItem>, parts: &mut Vec<InputContentPart>, role: InputRole) {
    if parts.is_empty() {
        return;
    }
    items.push(InputItem::Message {
        role,
        content: InputMessageContent::Parts(std::mem::take(parts)),
    });
}

fn tool_result_text(content: Option<&ToolResultContent>) -> String {
    match content {
        Some(ToolResultContent::Text(text)) => text.clone(),
        Some(ToolResultContent::Blocks(blocks)) => blocks
            .iter()
            .filter_map(|block| match block {
                ToolResultBlock::Text { text } => Some(text.clone()),
                ToolResultBlock::Image { .. } => None,
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
                name: tool.name,
                description: tool.description,
                parameters: Some(tool.input_schema),
                strict: None,
            })
            .collect(),
    )
}

fn map_thinking(thinking: ClaudeThinkingConfig) -> ReasoningConfig {
    let effort = match thinking {
        ClaudeThinkingConfig::Enabled { budget_tokens } => budget_to_effort(budget_tokens as i32),
        ClaudeThinkingConfig::Disabled => ReasoningEffort::None,
    };
    ReasoningConfig {
        effort: Some(effort),
        summary: None,
    }
}
