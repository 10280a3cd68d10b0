use std::collections::HashMap;

use aigw_protocol::claude::stream::{
    ContentBlockDelta, StreamEvent as ClaudeStreamEvent, StreamEventKnown, StreamMessageDelta,
    StreamMessageStart,
};
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, MessageRole, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::openai::responses::stream::{ResponseStreamEvent, ResponseStreamEventKnown};
use aigw_protocol::openai::responses::types::OutputItem;
use serde_json::json;

use super::response::{map_status, map_usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    None,
    Text(u32),
    Thinking(u32),
    Tool { output_index: u32, claude_index: u32 },
}

/// Translates an OpenAI Responses event stream into Claude events.
#[derive(Debug, Clone)]
pub struct OpenAIResponseToClaudeStreamState {
    started: bool,
    done: bool,
    next_index: u32,
    open: OpenBlock,
    /// Responses output_index -> claude content-block index for tool calls.
    tool_blocks: HashMap<u32, u32>,
    saw_function_call: bool,
}

impl OpenAIResponseToClaudeStreamState {
    pub fn new() -> Self {
        Self {
            started: false,
            done: false,
            next_index: 0,
            open: OpenBlock::None,
            tool_blocks: HashMap::new(),
            saw_function_call: false,
        }
    }

    pub fn transform_event(&mut self, event: ResponseStreamEvent) -> Vec<ClaudeStreamEvent> {
        let event = match event {
            ResponseStreamEvent::Known(event) => event,
            ResponseStreamEvent::Unknown(_) => return Vec::new(),
        };

        match event {
            ResponseStreamEventKnown::Created { response }
            | ResponseStreamEventKnown::InProgress { response } => {
                if self.started {
                    return Vec::new();
                }
                self.started = true;
                vec![known(StreamEventKnown::MessageStart {
                    message: StreamMessageStart {
                        id: response.id,
                        model: response.model,
                        role: MessageRole::Assistant,
                        content: Vec::new(),
                        usage: ClaudeUsage::default(),
                        stop_reason: None,
                    },
                })]
            }
            ResponseStreamEventKnown::OutputItemAdded { output_index, item } => match item {
                OutputItem::FunctionCall { call_id, name, .. } => {
                    self.saw_function_call = true;
                    let mut out = Vec::new();
                    self.close_open_block(&mut out);
                    let claude_index = self.next_index;
                    self.next_index += 1;
                    self.tool_blocks.insert(output_index, claude_index);
                    self.open = OpenBlock::Tool {
                        output_index,
                        claude_index,
                    };
                    out.push(known(StreamEventKnown::ContentBlockStart {
                        index: claude_index,
                        content_block: ClaudeBlock::ToolUse {
                            id: call_id,
                            name,
                            input: json!({}),
                        },
                    }));
                    out
                }
                _ => Vec::new(),
            },
            ResponseStreamEventKnown::OutputTextDelta { delta, .. } => {
                if delta.is_empty() {
                    return Vec::new();
                }
                let mut out = Vec::new();
                self.ensure_text_block(&mut out);
                let index = self.open_index();
                out.push(known(StreamEventKnown::ContentBlockDelta {
                    index,
                    delta: ContentBlockDelta::TextDelta { text: delta },
                }));
                out
            }
            ResponseStreamEventKnown::ReasoningSummaryTextDelta { delta, .. } => {
                if delta.is_empty() {
                    return Vec::new();
                }
                let mut out = Vec::new();
                self.ensure_thinking_block(&mut out);
                let index = self.open_index();
                out.push(known(StreamEventKnown::ContentBlockDelta {
                    index,
                    delta: ContentBlockDelta::ThinkingDelta { thinking: delta },
                }));
                out
            }
            ResponseStreamEventKnown::FunctionCallArgumentsDelta {
                output_index,
                delta,
                ..
            } => {
                if delta.is_empty() {
                    return Vec::new();
                }
                let index = self
                    .tool_blocks
                    .get(&output_index)
                    .copied()
                    .unwrap_or(output_index);
                vec![known(StreamEventKnown::ContentBlockDelta {
                    index,
                    delta: ContentBlockDelta::InputJsonDelta {
                        partial_json: delta,
                    },
                })]
            }
            ResponseStreamEventKnown::OutputItemDone { output_index, .. } => {
                let mut out = Vec::new();
                match self.open {
                    OpenBlock::Tool {
                        output_index: open_index,
                        ..
                    } if open_index == output_index => self.close_open_block(&mut out),
                    _ => {}
                }
                out
            }
            ResponseStreamEventKnown::Completed { response }
            | ResponseStreamEventKnown::Failed { response } => {
                self.done = true;
                let mut out = Vec::new();
                self.close_open_block(&mut out);
                out.push(known(StreamEventKnown::MessageDelta {
                    delta: StreamMessageDelta {
                        stop_reason: Some(map_status(&response.status, self.saw_function_call)),
                        stop_sequence: None,
                    },
                    usage: response
                        .usage
                        .as_ref()
                        .map(map_usage)
                        .unwrap_or_default(),
                }));
                out.push(known(StreamEventKnown::MessageStop));
                out
            }
            ResponseStreamEventKnown::ContentPartAdded { .. }
            | ResponseStreamEventKnown::OutputTextDone { .. }
            | ResponseStreamEventKnown::FunctionCallArgumentsDone { .. } => Vec::new(),
        }
    }

    /// Close out the message if the upstream dropped without completing.
    pub fn finish(&mut self) -> Vec<ClaudeStreamEvent> {
        if !self.started || self.done {
            return Vec::new();
        }
        self.done = true;
        let mut out = Vec::new();
        self.close_open_block(&mut out);
        out.push(known(StreamEventKnown::MessageDelta {
            delta: StreamMessageDelta {
                stop_reason: Some(StopReason::end_turn()),
                stop_sequence: None,
            },
            usage: ClaudeUsage::default(),
        }));
        out.push(known(StreamEventKnown::MessageStop));
        out
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

impl Default for OpenAIResponseToClaudeStreamState {
    fn default() -> Self {
        Self::new()
    }
}

fn known(event: StreamEventKnown) -> ClaudeStreamEvent {
    ClaudeStreamEvent::Known(event)
}
