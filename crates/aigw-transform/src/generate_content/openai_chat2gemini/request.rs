use std::collections::HashMap;

use aigw_protocol::gemini::generate_content::{GenerateContentRequest, SystemInstruction};
use aigw_protocol::gemini::types::{
    Blob, Content, ContentRole, FunctionCall, FunctionCallingConfig, FunctionCallingMode,
    FunctionDeclaration, FunctionResponse, GenerationConfig, Part, ThinkingConfig, ToolConfig,
    ToolDeclaration,
};
use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::types::{
    ReasoningEffort, RequestMessage, StopConfiguration, ToolChoiceMode, ToolChoiceOption,
    ToolDefinition, UserContent, UserContentPart,
};
use serde_json::json;

use crate::dispatch::GeminiGenerateRequest;
use crate::reasoning::effort_to_budget;
use crate::schema::clean_schema_for_gemini;

/// Convert an OpenAI chat-completions request into a Gemini generateContent
/// request.
pub fn transform_request(request: ChatCompletionRequest) -> GeminiGenerateRequest {
    // functionResponse parts need the called function's name; index the
    // conversation's tool calls by id first.
    let tool_names = collect_tool_call_names(&request.messages);

    let mut system_texts: Vec<String> = Vec::new();
    let mut contents: Vec<Content> = Vec::new();

    for message in &request.messages {
        match message {
            RequestMessage::System { content, .. } | RequestMessage::Developer { content, .. } => {
                let text = content.clone().into_text();
                if !text.is_empty() {
                    system_texts.push(text);
                }
            }
            RequestMessage::User { content, .. } => {
                let parts = map_user_parts(content);
                if !parts.is_empty() {
                    contents.push(Content {
                        role: Some(ContentRole::User),
                        parts,
                    });
                }
            }
            RequestMessage::Assistant {
                content,
                tool_calls,
                ..
            } => {
                let mut parts = Vec::new();
                if let Some(content) = content {
                    let text = content.clone().into_text();
                    if !text.is_empty() {
                        parts.push(Part::text(text));
                    }
                }
                if let Some(tool_calls) = tool_calls {
                    for tool_call in tool_calls {
                        let args = serde_json::from_str(&tool_call.function.arguments)
                            .unwrap_or_else(|_| {
                                tracing::warn!(
                                    tool = %tool_call.function.name,
                                    "tool call arguments were not valid JSON; substituting empty args"
                                );
                                json!({})
                            });
                        parts.push(Part::function_call(FunctionCall {
                            id: Some(tool_call.id.clone()),
                            name: tool_call.function.name.clone(),
                            args: Some(args),
                        }));
                    }
                }
                if !parts.is_empty() {
                    contents.push(Content {
                        role: Some(ContentRole::Model),
                        parts,
                    });
                }
            }
            RequestMessage::Tool {
                content,
                tool_call_id,
            } => {
                let Some(name) = tool_names.get(tool_call_id) else {
                    tracing::warn!(tool_call_id = %tool_call_id, "tool message without a matching tool call; skipping");
                    continue;
                };
                contents.push(Content {
                    role: Some(ContentRole::User),
                    parts: vec![Part::function_response(FunctionResponse {
                        id: Some(tool_call_id.clone()),
                        name: name.clone(),
                        response: json!({ "result": content.clone().into_text() }),
                    })],
                });
            }
        }
    }

    let system_instruction = if system_texts.is_empty() {
        None
    } else {
        Some(SystemInstruction::Content(Content {
            role: None,
            parts: vec![Part::text(system_texts.join("\n"))],
        }))
    };

    let generation_config = GenerationConfig {
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: None,
        max_output_tokens: request.output_token_cap(),
        stop_sequences: map_stop(request.stop),
        thinking_config: request.reasoning_effort.map(map_reasoning),
    };

    GeminiGenerateRequest {
        model: request.model,
        body: GenerateContentRequest {
            contents,
            system_instruction,
            tools: map_tools(request.tools),
            tool_config: map_tool_choice(request.tool_choice),
            generation_config: Some(generation_config),
        },
    }
}

fn collect_tool_call_names(messages: &[RequestMessage]) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for message in messages {
        if let RequestMessage::Assistant {
            tool_calls: Some(tool_calls),
            ..
        } = message
        {
            for tool_call in tool_calls {
                names.insert(tool_call.id.clone(), tool_call.function.name.clone());
            }
        }
    }
    names
}

fn map_user_parts(content: &UserContent) -> Vec<Part> {
    match content {
        UserContent::Text(text) => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Part::text(text.clone())]
            }
        }
        UserContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                UserContentPart::Text { text } => {
                    if text.is_empty() {
                        None
                    } else {
                        Some(Part::text(text.clone()))
                    }
                }
                UserContentPart::ImageUrl { image_url } => map_image_url(&image_url.url),
            })
            .collect(),
    }
}

fn map_image_url(url: &str) -> Option<Part> {
    if let Some(rest) = url.strip_prefix("data:")
        && let Some((media_type, data)) = rest.split_once(";base64,")
    {
        return Some(Part {
            inline_data: Some(Blob {
                mime_type: media_type.to_string(),
                data: data.to_string(),
            }),
            ..Part::default()
        });
    }
    tracing::warn!(url = %url, "gemini inline images require base64 data; skipping url image");
    None
}

fn map_tools(tools: Option<Vec<ToolDefinition>>) -> Option<Vec<ToolDeclaration>> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    let declarations = tools
        .into_iter()
        .map(|ToolDefinition::Function { function }| FunctionDeclaration {
            name: function.name,
            description: function.description,
            parameters: function
                .parameters
                .as_ref()
                .map(clean_schema_for_gemini),
        })
        .collect();
    Some(vec![ToolDeclaration {
        function_declarations: Some(declarations),
    }])
}

fn map_tool_choice(choice: Option<ToolChoiceOption>) -> Option<ToolConfig> {
    let config = match choice? {
        ToolChoiceOption::Mode(ToolChoiceMode::Auto) => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Auto),
            allowed_function_names: None,
        },
        ToolChoiceOption::Mode(ToolChoiceMode::Required) => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Any),
            allowed_function_names: None,
        },
        ToolChoiceOption::Mode(ToolChoiceMode::None) => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::None),
            allowed_function_names: None,
        },
        ToolChoiceOption::Named(named) => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Any),
            allowed_function_names: Some(vec![named.function.name]),
        },
    };
    Some(ToolConfig {
        function_calling_config: Some(config),
    })
}

fn map_reasoning(effort: ReasoningEffort) -> ThinkingConfig {
    let budget = effort_to_budget(effort);
    ThinkingConfig {
        include_thoughts: if budget == 0 { None } else { Some(true) },
        thinking_budget: Some(budget),
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
