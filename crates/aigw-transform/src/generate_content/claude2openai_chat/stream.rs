use std::collections::BTreeMap;

use aigw_protocol::claude::stream::{
    ContentBlockDelta, StreamEvent as ClaudeStreamEvent, StreamEventKnown,
};
use aigw_protocol::claude::types::{ContentBlock as ClaudeBlock, Usage as ClaudeUsage};
use aigw_protocol::openai::chat_completions::stream::{
    ChatCompletionChunk, ChatCompletionChunkObjectType, StreamChoice, StreamDelta, StreamRole,
    ToolCallChunk, ToolCallChunkFunction,
};
use aigw_protocol::openai::chat_completions::types::{FinishReason, ToolCallType, Usage};

use super::response::{map_stop_reason, map_usage};

#[derive(Debug, Clone)]
struct ToolCallInfo {
    id: String,
    name: String,
    /// Chat-completions tool-call slot; Claude block indexes are not dense.
    ordinal: i64,
}

/// Translates a Claude event stream into OpenAI chat-completion chunks.
#[derive(Debug, Clone)]
pub struct ClaudeToOpenAIChatStreamState {
    id: String,
    model: String,
    created: i64,
    tool_calls: BTreeMap<u32, ToolCallInfo>,
    next_tool_ordinal: i64,
    finish_emitted: bool,
}

impl ClaudeToOpenAIChatStreamState {
    pub fn new(created: i64) -> Self {
        Self {
            id: "unknown".to_string(),
            model: "unknown".to_string(),
            created,
            tool_calls: BTreeMap::new(),
            next_tool_ordinal: 0,
            finish_emitted: false,
        }
    }

    pub fn transform_event(&mut self, event: ClaudeStreamEvent) -> Vec<ChatCompletionChunk> {
        let event = match event {
            ClaudeStreamEvent::Known(event) => event,
            ClaudeStreamEvent::Unknown(_) => return Vec::new(),
        };

        match event {
            StreamEventKnown::MessageStart { message } => {
                self.id = message.id;
                self.model = message.model;
                vec![self.chunk(
                    StreamDelta {
                        role: Some(StreamRole::Assistant),
                        ..StreamDelta::default()
                    },
                    None,
                    None,
                )]
            }
            StreamEventKnown::ContentBlockStart {
                index,
                content_block,
            } => self.map_block_start(index, content_block),
            StreamEventKnown::ContentBlockDelta { index, delta } => {
                self.map_block_delta(index, delta)
            }
            StreamEventKnown::ContentBlockStop { .. } => Vec::new(),
            StreamEventKnown::MessageDelta { delta, usage } => {
                let finish_reason = delta.stop_reason.map(map_stop_reason);
                if finish_reason.is_some() {
                    self.finish_emitted = true;
                }
                let usage = stream_usage(&usage);
                if finish_reason.is_none() && usage.is_none() {
                    return Vec::new();
                }
                vec![self.chunk(StreamDelta::default(), finish_reason, usage)]
            }
            StreamEventKnown::MessageStop => {
                if self.finish_emitted {
                    Vec::new()
                } else {
                    self.finish_emitted = true;
                    vec![self.chunk(StreamDelta::default(), Some(FinishReason::stop()), None)]
                }
            }
            StreamEventKnown::Ping => Vec::new(),
            StreamEventKnown::Error { error } => {
                tracing::warn!(?error, "upstream stream error event");
                Vec::new()
            }
        }
    }

    pub fn finish(&mut self) -> Vec<ChatCompletionChunk> {
        // Claude streams terminate with message_stop; nothing is owed here.
        Vec::new()
    }

    fn map_block_start(
        &mut self,
        index: u32,
        content_block: ClaudeBlock,
    ) -> Vec<ChatCompletionChunk> {
        match content_block {
            ClaudeBlock::Text { text } => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![self.text_chunk(text)]
                }
            }
            ClaudeBlock::Thinking { thinking, .. } => {
                if thinking.is_empty() {
                    Vec::new()
                } else {
                    vec![self.reasoning_chunk(thinking)]
                }
            }
            ClaudeBlock::ToolUse { id, name, .. } => {
                let ordinal = self.next_tool_ordinal;
                self.next_tool_ordinal += 1;
                self.tool_calls.insert(
                    index,
                    ToolCallInfo {
                        id: id.clone(),
                        name: name.clone(),
                        ordinal,
                    },
                );
                vec![self.tool_call_start(index)]
            }
            _ => Vec::new(),
        }
    }

    fn map_block_delta(&mut self, index: u32, delta: ContentBlockDelta) -> Vec<ChatCompletionChunk> {
        match delta {
            ContentBlockDelta::TextDelta { text } => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![self.text_chunk(text)]
                }
            }
            ContentBlockDelta::ThinkingDelta { thinking } => {
                if thinking.is_empty() {
                    Vec::new()
                } else {
                    vec![self.reasoning_chunk(thinking)]
                }
            }
            ContentBlockDelta::InputJsonDelta { partial_json } => {
                if partial_json.is_empty() {
                    Vec::new()
                } else {
                    vec![self.tool_call_delta(index, partial_json)]
                }
            }
            ContentBlockDelta::SignatureDelta { .. } => Vec::new(),
        }
    }

    fn tool_call_start(&self, index: u32) -> ChatCompletionChunk {
        let info = self.tool_calls.get(&index);
        let tool_call = ToolCallChunk {
            index: info.map(|tool| tool.ordinal).unwrap_or(index as i64),
            id: info.map(|tool| tool.id.clone()),
            r#type: Some(ToolCallType::Function),
            function: Some(ToolCallChunkFunction {
                name: info.map(|tool| tool.name.clone()),
                arguments: None,
            }),
        };
        self.chunk(
            StreamDelta {
                tool_calls: Some(vec![tool_call]),
                ..StreamDelta::default()
            },
            None,
            None,
        )
    }

    fn tool_call_delta(&self, index: u32, partial_json: String) -> ChatCompletionChunk {
        let ordinal = self
            .tool_calls
            .get(&index)
            .map(|tool| tool.ordinal)
            .unwrap_or(index as i64);
        let tool_call = ToolCallChunk {
            index: ordinal,
            id: None,
            r#type: Some(ToolCallType::Function),
            function: Some(ToolCallChunkFunction {
                name: None,
                arguments: Some(partial_json),
            }),
        };
        self.chunk(
            StreamDelta {
                tool_calls: Some(vec![tool_call]),
                ..StreamDelta::default()
            },
            None,
            None,
        )
    }

    fn text_chunk(&self, text: String) -> ChatCompletionChunk {
        self.chunk(
            StreamDelta {
                content: Some(text),
                ..StreamDelta::default()
            },
            None,
            None,
        )
    }

    fn reasoning_chunk(&self, thinking: String) -> ChatCompletionChunk {
        self.chunk(
            StreamDelta {
                reasoning_content: Some(thinking),
                ..StreamDelta::default()
            },
            None,
            None,
        )
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

fn stream_usage(usage: &ClaudeUsage) -> Option<Usage> {
    if usage.input_tokens.is_none() && usage.output_tokens.is_none() {
        return None;
    }
    Some(map_usage(usage))
}
