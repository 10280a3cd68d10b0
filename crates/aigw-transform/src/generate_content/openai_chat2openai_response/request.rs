use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::types::{
    RequestMessage, ToolDefinition as ChatToolDefinition, UserContent, UserContentPart,
};
use aigw_protocol::openai::responses::request::{InputParam, ResponseRequest};
use aigw_protocol::openai::responses::types::{
    InputContentPart, InputItem, InputMessageContent, InputRole, ReasoningConfig, ToolDefinition,
};

/// Convert an OpenAI chat-completions request into an OpenAI Responses
/// request.
pub fn transform_request(request: ChatCompletionRequest) -> ResponseRequest {
    let mut instructions: Vec<String> = Vec::new();
    let mut items = Vec::new();

    for message in &request.messages {
        match message {
            RequestMessage::System { content, .. } | RequestMessage::Developer { content, .. } => {
                let text = content.clone().into_text();
                if !text.is_empty() {
                    instructions.push(text);
                }
            }
            RequestMessage::User { content, .. } => {
                let parts = map_user_parts(content);
                if !parts.is_empty() {
                    items.push(InputItem::Message {
                        role: InputRole::User,
                        content: InputMessageContent::Parts(parts),
                    });
                }
            }
            RequestMessage::Assistant {
                content,
                tool_calls,
                ..
            } => {
                if let Some(content) = content {
                    let text = content.clone().into_text();
                    if !text.is_empty() {
                        items.push(InputItem::Message {
                            role: InputRole::Assistant,
                            content: InputMessageContent::Parts(vec![
                                InputContentPart::OutputText { text },
                            ]),
                        });
                    }
                }
                if let Some(tool_calls) = tool_calls {
                    for tool_call in tool_calls {
                        items.push(InputItem::FunctionCall {
                            id: None,
                            call_id: tool_call.id.clone(),
                            name: tool_call.function.name.clone(),
                            arguments: tool_call.function.arguments.clone(),
                        });
                    }
                }
            }
            RequestMessage::Tool {
                content,
                tool_call_id,
            } => {
                items.push(InputItem::FunctionCallOutput {
                    call_id: tool_call_id.clone(),
                    output: content.clone().into_text(),
                });
            }
        }
    }

    ResponseRequest {
        model: request.model,
        input: InputParam::Items(items),
        instructions: if instructions.is_empty() {
            None
        } else {
            Some(instructions.join("\n"))
        },
        max_output_tokens: request.max_completion_tokens.or(request.max_tokens),
        temperature: request.temperature,
        top_p: request.top_p,
        stream: request.stream,
        tools: map_tools(request.tools),
        tool_choice: None,
        parallel_tool_calls: request.parallel_tool_calls,
        reasoning: request.reasoning_effort.map(|effort| ReasoningConfig {
            effort: Some(effort),
            summary: None,
        }),
        store: Some(false),
    }
}

fn map_user_parts(content: &UserContent) -> Vec<InputContentPart> {
    match content {
        UserContent::Text(text) => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![InputContentPart::InputText { text: text.clone() }]
            }
        }
        UserContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                UserContentPart::Text { text } => {
                    if text.is_empty() {
                        None
                    } else {
                        Some(InputContentPart::InputText { text: text.clone() })
                    }
                }
                UserContentPart::ImageUrl { image_url } => Some(InputContentPart::InputImage {
                    image_url: Some(image_url.url.clone()),
                }),
            })
            .collect(),
    }
}

fn map_tools(tools: Option<Vec<ChatToolDefinition>>) -> Option<Vec<ToolDefinition>> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .into_iter()
            .map(
                |ChatToolDefinition::Function { function }| ToolDefinition::Function {
                    name: function.name,
                    description: function.description,
                    parameters: function.parameters,
                    strict: function.strict,
                },
            )
            .collect(),
    )
}
