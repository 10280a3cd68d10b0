use std::collections::HashMap;

use aigw_protocol::openai::chat_completions::stream::{
    ChatCompletionChunk, ChatCompletionChunkObjectType, StreamChoice, StreamDelta, StreamRole,
    ToolCallChunk, ToolCallChunkFunction,
};
use aigw_protocol::openai::chat_completions::types::{FinishReason, ToolCallType, Usage};
use aigw_protocol::openai::responses::stream::{
    ResponseStreamEvent, ResponseStreamEventKnown,
};
use aigw_protocol::openai::responses::types::OutputItem;

use super::response::{map_status, map_usage};

/// Translates an OpenAI Responses event stream into chat-completion chunks.
#[derive(Debug, Clone)]
pub struct OpenAIResponseToOpenAIChatStreamState {
    id: String,
    model: String,
    created: i64,
    /// Responses output_index -> chat tool_calls slot.
    tool_ordinals: HashMap<u32, i64>,
    next_tool_ordinal: i64,
    saw_function_call: bool,
    finish_emitted: bool,
}

impl OpenAIResponseToOpenAIChatStreamState {
    pub fn new(created: i64) -> Self {
        Self {
            id: "unknown".to_string(),
            model: "unknown".to_string(),
            created,
            tool_ordinals: HashMap::new(),
            next_tool_ordinal: 0,
            saw_function_call: false,
            finish_emitted: false,
        }
    }

    pub fn transform_event(&mut self, event: ResponseStreamEvent) -> Vec<ChatCompletionChunk> {
        let event = match event {
            ResponseStreamEvent::Known(event) => event,
            ResponseStreamEvent::Unknown(_) => return Vec::new(),
        };

        match event {
            ResponseStreamEventKnown::Created { response }
            | ResponseStreamEventKnown::InProgress { response } => {
                self.id = response.id;
                self.model = response.model;
                vec![self.chunk(
                    StreamDelta {
                        role: Some(StreamRole::Assistant),
                        ..StreamDelta::default()
                    },
                    None,
                    None,
                )]
            }
            ResponseStreamEventKnown::OutputItemAdded { output_index, item } => match item {
                OutputItem::FunctionCall { call_id, name, .. } => {
                    self.saw_function_call = true;
                    let ordinal = self.next_tool_ordinal;
                    self.next_tool_ordinal += 1;
                    self.tool_ordinals.insert(output_index, ordinal);
                    vec![self.chunk(
                        StreamDelta {
                            tool_calls: Some(vec![ToolCallChunk {
                                index: ordinal,
                                id: Some(call_id),
                                r#type: Some(ToolCallType::Function),
                                function: Some(ToolCallChunkFunction {
                                    name: Some(name),
                                    arguments: None,
                                }),
                            }]),
                            ..StreamDelta::default()
                        },
                        None,
                        None,
                    )]
                }
                _ => Vec::new(),
            },
            ResponseStreamEventKnown::OutputTextDelta { delta, .. } => {
                if delta.is_empty() {
                    Vec::new()
                } else {
                    vec![self.chunk(
                        StreamDelta {
                            content: Some(delta),
                            ..StreamDelta::default()
                        },
                        None,
                        None,
                    )]
                }
            }
            ResponseStreamEventKnown::ReasoningSummaryTextDelta { delta, .. } => {
                if delta.is_empty() {
                    Vec::new()
                } else {
                    vec![self.chunk(
                        StreamDelta {
                            reasoning_content: Some(delta),
                            ..StreamDelta::default()
                        },
                        None,
                        None,
                    )]
                }
            }
            ResponseStreamEventKnown::FunctionCallArgumentsDelta {
                output_index,
                delta,
                ..
            } => {
                if delta.is_empty() {
                    return Vec::new();
                }
                let ordinal = self
                    .tool_ordinals
                    .get(&output_index)
                    .copied()
                    .unwrap_or(output_index as i64);
                vec![self.chunk(
                    StreamDelta {
                        tool_calls: Some(vec![ToolCallChunk {
                            index: ordinal,
                            id: None,
                            r#type: Some(ToolCallType::Function),
                            function: Some(ToolCallChunkFunction {
                                name: None,
                                arguments: Some(delta),
                            }),
                        }]),
                        ..StreamDelta::default()
                    },
                    None,
                    None,
                )]
            }
            ResponseStreamEventKnown::Completed { response }
            | ResponseStreamEventKnown::Failed { response } => {
                self.finish_emitted = true;
                let finish_reason = map_status(&response.status, self.saw_function_call);
                vec![self.chunk(
                    StreamDelta::default(),
                    Some(finish_reason),
                    response.usage.as_ref().map(map_usage),
                )]
            }
            ResponseStreamEventKnown::ContentPartAdded { .. }
            | ResponseStreamEventKnown::OutputTextDone { .. }
            | ResponseStreamEventKnown::FunctionCallArgumentsDone { .. }
            | ResponseStreamEventKnown::OutputItemDone { .. } => Vec::new(),
        }
    }

    /// Close the stream if the upstream dropped without a completed event.
    pub fn finish(&mut self) -> Vec<ChatCompletionChunk> {
        if self.finish_emitted {
            return Vec::new();
        }
        self.finish_emitted = true;
        vec![self.chunk(StreamDelta::default(), Some(FinishReason::stop()), None)]
    }

    fn chunk(
        &self,
        delta: StreamDelta,
        finish_reason: Option<FinishReason>,
        usage: Option<Usage>,
    ) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: ChatCompletionChunkObjectType::ChatCompletionChunk,
            created: self.created,
            model: self.model.clone(),
            choices: vec![StreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
        }
    }
}
