use aigw_protocol::claude::stream::{
    ContentBlockDelta, StreamEvent as ClaudeStreamEvent, StreamEventKnown, StreamMessageDelta,
    StreamMessageStart,
};
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, MessageRole, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::openai::chat_completions::stream::{ChatCompletionChunk, ToolCallChunk};
use serde_json::json;

use super::response::{map_finish_reason, map_usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    None,
    Text(u32),
    Thinking(u32),
    Tool { openai_index: i64, claude_index: u32 },
}

/// Translates an OpenAI chat-completion chunk stream into Claude events.
///
/// The terminal `message_delta`/`message_stop` pair is deferred to `finish`
/// so a trailing usage-only chunk (stream_options.include_usage) still lands
/// on the terminal event.
#[derive(Debug, Clone)]
pub struct OpenAIChatToClaudeStreamState {
    started: bool,
    done: bool,
    next_index: u32,
    open: OpenBlock,
    pending_stop: Option<StopReason>,
    usage: ClaudeUsage,
}

impl OpenAIChatToClaudeStreamState {
    pub fn new() -> Self {
        Self {
            started: false,
            done: false,
            next_index: 0,
            open: OpenBlock::None,
            pending_stop: None,
            usage: ClaudeUsage::default(),
        }
    }

    pub fn transform_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<ClaudeStreamEvent> {
        let mut out = Vec::new();

        if !self.started {
            self.started = true;
            out.push(known(StreamEventKnown::MessageStart {
                message: StreamMessageStart {
                    id: chunk.id.clone(),
                    model: chunk.model.clone(),
                    role: MessageRole::Assistant,
                    content: Vec::new(),
                    usage: ClaudeUsage::default(),
                    stop_reason: None,
                },
            }));
        }

        if let Some(usage) = &chunk.usage {
            self.usage = map_usage(usage);
        }

        let Some(choice) = chunk.choices.into_iter().find(|choice| choice.index == 0) else {
            return out;
        };

        if let Some(reasoning) = choice.delta.reasoning_content
            && !reasoning.is_empty()
        {
            self.ensure_thinking_block(&mut out);
            let index = self.open_index();
            out.push(known(StreamEventKnown::ContentBlockDelta {
                index,
                delta: ContentBlockDelta::ThinkingDelta {
                    thinking: reasoning,
                },
            }));
        }

        if let Some(text) = choice.delta.content
            && !text.is_empty()
        {
            self.ensure_text_block(&mut out);
            let index = self.open_index();
            out.push(known(StreamEventKnown::ContentBlockDelta {
                index,
                delta: ContentBlockDelta::TextDelta { text },
            }));
        }

        if let Some(tool_calls) = choice.delta.tool_calls {
            for tool_call in tool_calls {
                self.map_tool_call_chunk(tool_call, &mut out);
            }
        }

        if let Some(finish_reason) = choice.finish_reason {
            self.close_open_block(&mut out);
            self.pending_stop = Some(map_finish_reason(finish_reason));
        }

        out
    }

    pub fn finish(&mut self) -> Vec<ClaudeStreamEvent> {
        if !self.started || self.done {
            return Vec::new();
        }
        self.done = true;

        let mut out = Vec::new();
        self.close_open_block(&mut out);
        out.push(known(StreamEventKnown::MessageDelta {
            delta: StreamMessageDelta {
                stop_reason: Some(self.pending_stop.take().unwrap_or(StopReason::end_turn())),
                stop_sequence: None,
            },
            usage: self.usage.clone(),
        }));
        out.push(known(StreamEventKnown::MessageStop));
        out
    }

    fn map_tool_call_chunk(&mut self, tool_call: ToolCallChunk, out: &mut Vec<ClaudeStreamEvent>) {
        let is_new_call = tool_call.id.is_some()
            || !matches!(self.open, OpenBlock::Tool { openai_index, .. } if openai_index == tool_call.index);

        if is_new_call {
            self.close_open_block(out);
            let claude_index = self.next_index;
            self.next_index += 1;
            let id = tool_call
                .id
                .unwrap_or_else(|| format!("toolu_{}", claude_index));
            let name = tool_call
                .function
                .as_ref()
                .and_then(|function| function.name.clone())
                .unwrap_or_default();
            self.open = OpenBlock::Tool {
                openai_index: tool_call.index,
                claude_index,
            };
            out.push(known(StreamEventKnown::ContentBlockStart {
                index: claude_index,
                content_block: ClaudeBlock::ToolUse {
                    id,
                    name,
                    input: json!({}),
                },
            }));
        }

        if let Some(arguments) = tool_call
            .function
            .and_then(|function| function.arguments)
            && !arguments.is_empty()
        {
            let index = self.open_index();
            out.push(known(StreamEventKnown::ContentBlockDelta {
                index,
                delta: ContentBlockDelta::InputJsonDelta {
                    partial_json: arguments,
                },
            }));
        }
    }

    fn ensure_text_block(&mut self, out: &mut Vec<ClaudeStreamEvent>) {
        if matches!(self.open, OpenBlock::Text(_)) {
            return;
        }
        self.close_open_block(out);
        let index = self.next_index;
        self.next_index += 1;
        self.open = OpenBlock::Text(index);
        out.push(known(StreamEventKnown::ContentBlockStart {
            index,
            content_block: ClaudeBlock::Text {
                text: String::new(),
            },
        }));
    }

    fn ensure_thinking_block(&mut self, out: &mut Vec<ClaudeStreamEvent>) {
        if matches!(self.open, OpenBlock::Thinking(_)) {
            return;
        }
        self.close_open_block(out);
        let index = self.next_index;
        self.next_index += 1;
        self.open = OpenBlock::Thinking(index);
        out.push(known(StreamEventKnown::ContentBlockStart {
            index,
            content_block: ClaudeBlock::Thinking {
                thinking: String::new(),
                signature: None,
            },
        }));
    }

    fn close_open_block(&mut self, out: &mut Vec<ClaudeStreamEvent>) {
        let index = match self.open {
            OpenBlock::None => return,
            OpenBlock::Text(index) | OpenBlock::Thinking(index) => index,
            OpenBlock::Tool { claude_index, .. } => claude_index,
        };
        self.open = OpenBlock::None;
        out.push(known(StreamEventKnown::ContentBlockStop { index }));
    }

    fn open_index(&self) -> u32 {
        match self.open {
            OpenBlock::None => 0,
            OpenBlock::Text(index) | OpenBlock::Thinking(index) => index,
            OpenBlock::Tool { claude_index, .. } => claude_index,
        }
    }
}

impl Default for OpenAIChatToClaudeStreamState {
    fn default() -> Self {
        Self::new()
    }
}

fn known(event: StreamEventKnown) -> ClaudeStreamEvent {
    ClaudeStreamEvent::Known(event)
}
