use std::collections::{HashMap, VecDeque};

use aigw_protocol::gemini::types::{Content, ContentRole, ToolDeclaration};
use aigw_protocol::openai::responses::request::{InputParam, ResponseRequest};
use aigw_protocol::openai::responses::types::{
    InputContentPart, InputItem, InputMessageContent, InputRole, ReasoningConfig, ToolDefinition,
};

use crate::dispatch::GeminiGenerateRequest;
use crate::reasoning::budget_to_effort;

/// Convert a Gemini generateContent request into an OpenAI Responses request.
pub fn transform_request(request: GeminiGenerateRequest) -> ResponseRequest {
    let GeminiGenerateRequest { model, body } = request;

    let mut id_queues = build_call_id_queues(&body.contents);

    let mut items = Vec::new();
    let mut call_counter = 0usize;
    for content in &body.contents {
        map_content(content, &mut items, &mut id_queues, &mut call_counter);
    }

    let generation = body.generation_config.unwrap_or_default();

    ResponseRequest {
        model,
        input: InputParam::Items(items),
        instructions: body.system_instruction.and_then(|instruction| {
            let text = instruction.into_text();
            if text.is_empty() { None } else { Some(text) }
        }),
        max_output_tokens: generation.max_output_tokens,
        temperature: generation.temperature,
        top_p: generation.top_p,
        stream: None,
        tools: map_tools(body.tools),
        tool_choice: None,
        parallel_tool_calls: None,
        reasoning: generation
            .thinking_config
            .and_then(|config| config.thinking_budget)
            .map(|budget| ReasoningConfig {
                effort: Some(budget_to_effort(budget)),
                summary: None,
            }),
        store: Some(false),
    }
}

fn build_call_id_queues(contents: &[Content]) -> HashMap<String, VecDeque<String>> {
    let mut queues: HashMap<String, VecDeque<String>> = HashMap::new();
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
        }
    }
    queues
}

fn map_content(
    content: &Content,
    items: &mut Vec<InputItem>,
    id_queues: &mut HashMap<String, VecDeque<String>>,
    call_counter: &mut usize,
) {
    let role = match content.role {
        Some(ContentRole::Model) => InputRole::Assistant,
        _ => InputRole::User,
    };

    let mut parts: Vec<InputContentPart> = Vec::new();
    for part in &content.parts {
        if let Some(text) = &part.text {
            if text.is_empty() || part.thought == Some(true) {
                continue;
            }
            match role {
                InputRole::Assistant => {
                    parts.push(InputContentPart::OutputText { text: text.clone() })
                }
                _ => parts.push(InputContentPart::InputText { text: text.clone() }),
            }
        } else if let Some(blob) = &part.inline_data {
            parts.push(InputContentPart::InputImage {
                image_url: Some(format!("data:{};base64,{}", blob.mime_type, blob.data)),
            });
        } else if let Some(call) = &part.function_call {
            flush_parts(items, &mut parts, role);
            let call_id = call.id.clone().unwrap_or_else(|| {
                let id = format!("call_{:03}", *call_counter);
                *call_counter += 1;
                id
            });
            items.push(InputItem::FunctionCall {
                id: None,
                call_id,
                name: call.name.clone(),
                arguments: call
                    .args
                    .as_ref()
                    .map(|args| args.to_string())
                    .unwrap_or_else(|| "{}".to_string()),
            });
        } else if let Some(response) = &part.function_response {
            flush_parts(items, &mut parts, role);
            let call_id = response
                .id
                .clone()
                .or_else(|| {
                    id_queues
                        .get_mut(&response.name)
                        .and_then(|queue| queue.pop_front())
                })
                .unwrap_or_else(|| format!("call_{}", response.name));
            items.push(InputItem::FunctionCallOutput {
                call_id,
                output: response.response.to_string(),
            });
        }
    }
    flush_parts(items, &mut parts, role);
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

fn map_tools(tools: Option<Vec<ToolDeclaration>>) -> Option<Vec<ToolDefinition>> {
    let definitions: Vec<ToolDefinition> = tools?
        .into_iter()
        .flat_map(|tool| tool.function_declarations.unwrap_or_default())
        .map(|declaration| ToolDefinition::Function {
            name: declaration.name,
            description: declaration.description,
            parameters: declaration.parameters,
            strict: None,
        })
        .collect();
    if definitions.is_empty() {
        None
    } else {
        Some(definitions)
    }
}
