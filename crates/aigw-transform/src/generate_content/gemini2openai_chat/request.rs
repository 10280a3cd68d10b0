use std::collections::{HashMap, VecDeque};

use aigw_protocol::gemini::types::{
    Content, ContentRole, FunctionCallingConfig, FunctionCallingMode, ToolConfig,
    ToolDeclaration,
};
use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::types::{
    FunctionCall as OpenAIFunctionCall, FunctionDefinition, ImageUrl, NamedToolChoice,
    NamedToolChoiceFunction, RequestMessage, StopConfiguration, TextContent,
    ToolCall, ToolCallType, ToolChoiceMode, ToolChoiceOption, ToolDefinition, UserContent,
    UserContentPart,
};

use crate::dispatch::GeminiGenerateRequest;
use crate::reasoning::budget_to_effort;

/// Convert a Gemini generateContent request into an OpenAI chat-completions
/// request.
pub fn transform_request(request: GeminiGenerateRequest) -> ChatCompletionRequest {
    let GeminiGenerateRequest { model, body } = request;

    // OpenAI pairs calls and results by id; Gemini pairs by name and order.
    // Pre-assign ids per call, and count responses per name so calls with
    // no later response can be dropped.
    let (mut id_queues, mut response_counts) = index_function_parts(&body.contents);

    let mut messages = Vec::new();
    if let Some(instruction) = body.system_instruction {
        let text = instruction.into_text();
        if !text.is_empty() {
            messages.push(RequestMessage::System {
                content: TextContent::Text(text),
                name: None,
            });
        }
    }

    let mut call_counter = 0usize;
    for content in &body.contents {
        messages.extend(map_content(
            content,
            &mut id_queues,
            &mut response_counts,
            &mut call_counter,
        ));
    }

    let generation = body.generation_config.unwrap_or_default();

    ChatCompletionRequest {
        model,
        messages,
        max_tokens: None,
        max_completion_tokens: generation.max_output_tokens,
        temperature: generation.temperature,
        top_p: generation.top_p,
        stop: generation.stop_sequences.and_then(|stops| {
            match stops.len() {
                0 => None,
                1 => Some(StopConfiguration::Single(stops.into_iter().next()?)),
                _ => Some(StopConfiguration::Many(stops)),
            }
        }),
        stream: None,
        tools: map_tools(body.tools),
        tool_choice: body.tool_config.and_then(map_tool_config),
        parallel_tool_calls: None,
        reasoning_effort: generation
            .thinking_config
            .and_then(|config| config.thinking_budget)
            .map(budget_to_effort),
        user: None,
    }
}

type IdQueues = HashMap<String, VecDeque<String>>;
type ResponseCounts = HashMap<String, usize>;

fn index_function_parts(contents: &[Content]) -> (IdQueues, ResponseCounts) {
    let mut queues: IdQueues = HashMap::new();
    let mut counts: ResponseCounts = HashMap::new();
    let mut counter = 0usize;
    for content in contents {
        for part in &content.parts {
            if let Some(call) = &part.function_call {
                let id = call.id.clone().unwrap_or_else(|| {
                    let id = format!("call_{counter:03}");
                    counter += 1;
                    id
                });
                queues.entry(call.name.clone()).or_default().push_back(id);
            }
            if let Some(response) = &part.function_response {
                *counts.entry(response.name.clone()).or_default() += 1;
            }
        }
    }
    (queues, counts)
}

fn map_content(
    content: &Content,
    id_queues: &mut IdQueues,
    response_counts: &mut ResponseCounts,
    call_counter: &mut usize,
) -> Vec<RequestMessage> {
    let mut output = Vec::new();

    match content.role {
        Some(ContentRole::Model) => {
            let mut texts: Vec<String> = Vec::new();
            let mut reasoning: Vec<String> = Vec::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();

            for part in &content.parts {
                if let Some(text) = &part.text {
                    if text.is_empty() {
                        continue;
                    }
                    if part.thought == Some(true) {
                        reasoning.push(text.clone());
                    } else {
                        texts.push(text.clone());
                    }
                } else if let Some(call) = &part.function_call {
                    let id = call.id.clone().unwrap_or_else(|| {
                        let id = format!("call_{:03}", *call_counter);
                        *call_counter += 1;
                        id
                    });
                    let remaining = response_counts.get_mut(&call.name);
                    match remaining {
                        Some(count) if *count > 0 => {
                            *count -= 1;
                            tool_calls.push(ToolCall {
                                id,
                                r#type: ToolCallType::Function,
                                function: OpenAIFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call
                                        .args
                                        .as_ref()
                                        .map(|args| args.to_string())
                                        .unwrap_or_else(|| "{}".to_string()),
                                },
                            });
                        }
                        _ => {
                            tracing::warn!(tool = %call.name, "dropping function call with no paired response");
                        }
                    }
                }
            }

            let has_content = !texts.is_empty() || !reasoning.is_empty() || !tool_calls.is_empty();
            if has_content {
                output.push(RequestMessage::Assistant {
                    content: if texts.is_empty() {
                        None
                    } else {
                        Some(TextContent::Text(texts.join("\n")))
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
                    name: None,
                });
            }
        }
        _ => {
            let mut parts: Vec<UserContentPart> = Vec::new();
            for part in &content.parts {
                if let Some(text) = &part.text {
                    if !text.is_empty() {
                        parts.push(UserContentPart::Text { text: text.clone() });
                    }
                } else if let Some(blob) = &part.inline_data {
                    parts.push(UserContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", blob.mime_type, blob.data),
                            detail: None,
                        },
                    });
                } else if let Some(response) = &part.function_response {
                    flush_user_parts(&mut output, &mut parts);
                    let id = response
                        .id
                        .clone()
                        .or_else(|| {
                            id_queues
                                .get_mut(&response.name)
                                .and_then(|queue| queue.pop_front())
                        })
                        .unwrap_or_else(|| format!("call_{}", response.name));
                    output.push(RequestMessage::Tool {
                        content: TextContent::Text(function_response_text(&response.response)),
                        tool_call_id: id,
                    });
                }
            }
            flush_user_parts(&mut output, &mut parts);
        }
    }

    output
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

fn function_response_text(response: &serde_json::Value) -> String {
    match response.get("result") {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => response.to_string(),
    }
}

fn map_tools(tools: Option<Vec<ToolDeclaration>>) -> Option<Vec<ToolDefinition>> {
    let definitions: Vec<ToolDefinition> = tools?
        .into_iter()
        .flat_map(|tool| tool.function_declarations.unwrap_or_default())
        .map(|declaration| ToolDefinition::Function {
            function: FunctionDefinition {
                name: declaration.name,
                description: declaration.description,
                parameters: declaration.parameters,
                strict: None,
            },
        })
        .collect();
    if definitions.is_empty() {
        None
    } else {
        Some(definitions)
    }
}

fn map_tool_config(config: ToolConfig) -> Option<ToolChoiceOption> {
    let FunctionCallingConfig {
        mode,
        allowed_function_names,
    } = config.function_calling_config?;
    match mode? {
        FunctionCallingMode::Auto => Some(ToolChoiceOption::Mode(ToolChoiceMode::Auto)),
        FunctionCallingMode::Any => match allowed_function_names {
            Some(names) if names.len() == 1 => Some(ToolChoiceOption::Named(NamedToolChoice {
                r#type: ToolCallType::Function,
                function: NamedToolChoiceFunction {
                    name: names.into_iter().next()?,
                },
            })),
            _ => Some(ToolChoiceOption::Mode(ToolChoiceMode::Required)),
        },
        FunctionCallingMode::None => Some(ToolChoiceOption::Mode(ToolChoiceMode::None)),
    }
}
