use std::collections::HashMap;

use aigw_protocol::claude::messages::MessagesRequest;
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, ImageSource, MessageContent, MessageParam, MessageRole,
    ThinkingConfig as ClaudeThinkingConfig, Tool as ClaudeTool, ToolChoice as ClaudeToolChoice,
    ToolResultBlock, ToolResultContent,
};
use aigw_protocol::gemini::generate_content::{GenerateContentRequest, SystemInstruction};
use aigw_protocol::gemini::types::{
    Blob, Content, ContentRole, FunctionCall, FunctionCallingConfig, FunctionCallingMode,
    FunctionDeclaration, FunctionResponse, GenerationConfig, Part, ThinkingConfig, ToolConfig,
    ToolDeclaration,
};
use serde_json::json;

use crate::dispatch::GeminiGenerateRequest;
use crate::schema::clean_schema_for_gemini;

/// Convert a Claude messages request into a Gemini generateContent request.
pub fn transform_request(request: MessagesRequest) -> GeminiGenerateRequest {
    // Gemini functionResponse parts are keyed by function *name*; index the
    // conversation's tool_use blocks so results can be resolved by id.
    let tool_names = collect_tool_use_names(&request.messages);

    let mut contents = Vec::new();
    for message in &request.messages {
        if let Some(content) = map_message(message, &tool_names) {
            contents.push(content);
        }
    }

    let system_instruction = request.system.and_then(|system| {
        let text = system.into_text();
        if text.is_empty() {
            None
        } else {
            Some(SystemInstruction::Content(Content {
                role: None,
                parts: vec![Part::text(text)],
            }))
        }
    });

    let tools = map_tools(request.tools);
    let tool_config = request.tool_choice.map(map_tool_choice);
    let generation_config = GenerationConfig {
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k.map(|k| k as i64),
        max_output_tokens: Some(request.max_tokens as i64),
        stop_sequences: request.stop_sequences,
        thinking_config: request.thinking.map(map_thinking),
    };

    GeminiGenerateRequest {
        model: request.model,
        body: GenerateContentRequest {
            contents,
            system_instruction,
            tools,
            tool_config,
            generation_config: Some(generation_config),
        },
    }
}

fn collect_tool_use_names(messages: &[MessageParam]) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for message in messages {
        let MessageContent::Blocks(blocks) = &message.content else {
            continue;
        };
        for block in blocks {
            if let ClaudeBlock::ToolUse { id, name, .. } = block {
                names.insert(id.clone(), name.clone());
            }
        }
    }
    names
}

fn map_message(message: &MessageParam, tool_names: &HashMap<String, String>) -> Option<Content> {
    let role = match message.role {
        MessageRole::User => ContentRole::User,
        MessageRole::Assistant => ContentRole::Model,
    };

    let mut parts = Vec::new();
    match &message.content {
        MessageContent::Text(text) => {
            if !text.is_empty() {
                parts.push(Part::text(text.clone()));
            }
        }
        MessageContent::Blocks(blocks) => {
            for block in blocks {
                match block {
                    ClaudeBlock::Text { text } => {
                        if !text.is_empty() {
                            parts.push(Part::text(text.clone()));
                        }
                    }
                    ClaudeBlock::Thinking { thinking, .. } => {
                        if !thinking.is_empty() {
                            parts.push(Part::thought_text(thinking.clone()));
                        }
                    }
                    ClaudeBlock::RedactedThinking { .. } => {}
                    ClaudeBlock::Image { source } => {
                        if let Some(part) = map_image_part(source) {
                            parts.push(part);
                        }
                    }
                    ClaudeBlock::ToolUse { id, name, input } => {
                        parts.push(Part::function_call(FunctionCall {
                            id: Some(id.clone()),
                            name: name.clone(),
                            args: Some(input.clone()),
                        }));
                    }
                    ClaudeBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => {
                        let Some(name) = tool_names.get(tool_use_id) else {
                            tracing::warn!(tool_use_id = %tool_use_id, "tool result without a matching tool call; skipping");
                            continue;
                        };
                        parts.push(Part::function_response(FunctionResponse {
                            id: Some(tool_use_id.clone()),
                            name: name.clone(),
                            response: tool_result_value(content.as_ref()),
                        }));
                    }
                }
            }
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(Content {
        role: Some(role),
        parts,
    })
}

fn map_image_part(source: &ImageSource) -> Option<Part> {
    match source {
        ImageSource::Base64 { media_type, data } => Some(Part {
            inline_data: Some(Blob {
                mime_type: media_type.clone(),
                data: data.clone(),
            }),
            ..Part::default()
        }),
        ImageSource::Url { url } => {
            tracing::warn!(url = %url, "gemini inline images require base64 data; skipping url image");
            None
        }
    }
}

fn tool_result_value(content: Option<&ToolResultContent>) -> serde_json::Value {
    let text = match content {
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
    };
    json!({ "result": text })
}

fn map_tools(tools: Option<Vec<ClaudeTool>>) -> Option<Vec<ToolDeclaration>> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    let declarations = tools
        .into_iter()
        .map(|tool| FunctionDeclaration {
            name: tool.name,
            description: tool.description,
            parameters: Some(clean_schema_for_gemini(&tool.input_schema)),
        })
        .collect();
    Some(vec![ToolDeclaration {
        function_declarations: Some(declarations),
    }])
}

fn map_tool_choice(choice: ClaudeToolChoice) -> ToolConfig {
    let config = match choice {
        ClaudeToolChoice::Auto { .. } => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Auto),
            allowed_function_names: None,
        },
        ClaudeToolChoice::Any { .. } => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Any),
            allowed_function_names: None,
        },
        ClaudeToolChoice::Tool { name, .. } => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Any),
            allowed_function_names: Some(vec![name]),
        },
        ClaudeToolChoice::None => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::None),
            allowed_function_names: None,
        },
    };
    ToolConfig {
        function_calling_config: Some(config),
    }
}

fn map_thinking(thinking: ClaudeThinkingConfig) -> ThinkingConfig {
    match thinking {
        ClaudeThinkingConfig::Enabled { budget_tokens } => ThinkingConfig {
            include_thoughts: Some(true),
            thinking_budget: Some(budget_tokens as i32),
        },
        ClaudeThinkingConfig::Disabled => ThinkingConfig {
            include_thoughts: None,
            thinking_budget: Some(0),
        },
    }
}
