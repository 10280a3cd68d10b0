use std::collections::{HashMap, VecDeque};

use aigw_protocol::claude::messages::MessagesRequest;
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, ImageSource, MessageParam, MessageRole, SystemParam,
    ThinkingConfig as ClaudeThinkingConfig, Tool as ClaudeTool, ToolChoice as ClaudeToolChoice,
    ToolResultContent,
};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FunctionCallingConfig, FunctionCallingMode, ToolConfig,
    ToolDeclaration,
};
use serde_json::json;

use crate::dispatch::GeminiGenerateRequest;
use crate::generate_content::util::{
    DEFAULT_CLAUDE_MAX_TOKENS, content_from_blocks, merge_adjacent_roles,
};

/// Convert a Gemini generateContent request into a Claude messages request.
pub fn transform_request(request: GeminiGenerateRequest) -> MessagesRequest {
    let GeminiGenerateRequest { model, body } = request;

    // Gemini function calls may lack ids; assign stable synthetic ids and
    // hand them to functionResponses in call order, per function name.
    let mut id_queues = build_call_id_queues(&body.contents);

    let mut messages: Vec<MessageParam> = Vec::new();
    let mut synth_counter = 0usize;
    for content in &body.contents {
        if let Some(message) = map_content(content, &mut id_queues, &mut synth_counter) {
            messages.push(message);
        }
    }
    let messages = merge_adjacent_roles(messages);

    let system = body.system_instruction.and_then(|instruction| {
        let text = instruction.into_text();
        if text.is_empty() {
            None
        } else {
            Some(SystemParam::Text(text))
        }
    });

    let generation = body.generation_config.unwrap_or_default();

    MessagesRequest {
        model,
        max_tokens: generation
            .max_output_tokens
            .map(|tokens| tokens.max(1) as u32)
            .unwrap_or(DEFAULT_CLAUDE_MAX_TOKENS),
        messages,
        system,
        metadata: None,
        stop_sequences: generation.stop_sequences,
        stream: None,
        temperature: generation.temperature,
        thinking: generation.thinking_config.and_then(|config| {
            let budget = config.thinking_budget?;
            if budget == 0 {
                Some(ClaudeThinkingConfig::Disabled)
            } else if budget > 0 {
                Some(ClaudeThinkingConfig::Enabled {
                    budget_tokens: budget as u32,
                })
            } else {
                None
            }
        }),
        tool_choice: body.tool_config.and_then(map_tool_config),
        tools: map_tools(body.tools),
        top_k: generation.top_k.map(|k| k.max(0) as u32),
        top_p: generation.top_p,
    }
}

/// Pre-assign an id per functionCall, queued per function name so that
/// functionResponses (which only carry the name) resolve in call order.
fn build_call_id_queues(contents: &[Content]) -> HashMap<String, VecDeque<String>> {
    let mut queues: HashMap<String, VecDeque<String>> = HashMap::new();
    let mut counter = 0usize;
    for content in contents {
        for part in &content.parts {
            if let Some(call) = &part.function_call {
                let id = call.id.clone().unwrap_or_else(|| {
                    let id = format!("toolu_{counter:03}");
                    counter += 1;
                    id
                });
                queues.entry(call.name.clone()).or_default().push_back(id);
            }
        }
    }
    queues
}

fn map_content(
    content: &Content,
    id_queues: &mut HashMap<String, VecDeque<String>>,
    synth_counter: &mut usize,
) -> Option<MessageParam> {
    let role = match content.role {
        Some(ContentRole::Model) => MessageRole::Assistant,
        _ => MessageRole::User,
    };

    let mut blocks = Vec::new();
    for part in &content.parts {
        if let Some(text) = &part.text {
            if text.is_empty() {
                continue;
            }
            if part.thought == Some(true) {
                blocks.push(ClaudeBlock::Thinking {
                    thinking: text.clone(),
                    signature: part.thought_signature.clone(),
                });
            } else {
                blocks.push(ClaudeBlock::Text { text: text.clone() });
            }
        } else if let Some(call) = &part.function_call {
            let id = call.id.clone().unwrap_or_else(|| {
                // Matches the id pre-assigned in build_call_id_queues.
                let id = format!("toolu_{:03}", *synth_counter);
                *synth_counter += 1;
                id
            });
            blocks.push(ClaudeBlock::ToolUse {
                id,
                name: call.name.clone(),
                input: call.args.clone().unwrap_or_else(|| json!({})),
            });
        } else if let Some(response) = &part.function_response {
            let id = response
                .id
                .clone()
                .or_else(|| {
                    id_queues
                        .get_mut(&response.name)
                        .and_then(|queue| queue.pop_front())
                })
                .unwrap_or_else(|| format!("toolu_{}", response.name));
            blocks.push(ClaudeBlock::ToolResult {
                tool_use_id: id,
                content: Some(ToolResultContent::Text(function_response_text(
                    &response.response,
                ))),
                is_error: None,
            });
        } else if let Some(blob) = &part.inline_data {
            blocks.push(ClaudeBlock::Image {
                source: ImageSource::Base64 {
                    media_type: blob.mime_type.clone(),
                    data: blob.data.clone(),
                },
            });
        }
    }

    if blocks.is_empty() {
        return None;
    }
    Some(MessageParam {
        role,
        content: content_from_blocks(blocks),
    })
}

fn function_response_text(response: &serde_json::Value) -> String {
    // The common convention wraps plain output as {"result": ...}.
    match response.get("result") {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => response.to_string(),
    }
}

fn map_tools(tools: Option<Vec<ToolDeclaration>>) -> Option<Vec<ClaudeTool>> {
    let declarations: Vec<ClaudeTool> = tools?
        .into_iter()
        .flat_map(|tool| tool.function_declarations.unwrap_or_default())
        .map(|declaration| ClaudeTool {
            name: declaration.name,
            description: declaration.description,
            input_schema: declaration
                .parameters
                .unwrap_or_else(|| json!({ "type": "object" })),
        })
        .collect();
    if declarations.is_empty() {
        None
    } else {
        Some(declarations)
    }
}

fn map_tool_config(config: ToolConfig) -> Option<ClaudeToolChoice> {
    let FunctionCallingConfig {
        mode,
        allowed_function_names,
    } = config.function_calling_config?;
    match mode? {
        FunctionCallingMode::Auto => Some(ClaudeToolChoice::Auto {
            disable_parallel_tool_use: None,
        }),
        FunctionCallingMode::Any => match allowed_function_names {
            Some(names) if names.len() == 1 => Some(ClaudeToolChoice::Tool {
                name: names.into_iter().next()?,
                disable_parallel_tool_use: None,
            }),
            _ => Some(ClaudeToolChoice::Any {
                disable_parallel_tool_use: None,
            }),
        },
        FunctionCallingMode::None => Some(ClaudeToolChoice::None),
    }
}
