use aigw_protocol::claude::stream::{
    ContentBlockDelta, StreamEvent as ClaudeStreamEvent, StreamEventKnown, StreamMessageDelta,
    StreamMessageStart,
};
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, MessageRole, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::gemini::generate_content::GenerateContentResponse;
use serde_json::json;

use super::response::{map_finish_reason, map_usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    None,
    Text(u32),
    Thinking(u32),
}

/// Translates a Gemini streaming response into Claude events.
#[derive(Debug, Clone)]
pub struct GeminiToClaudeStreamState {
    model: String,
    started: bool,
    done: bool,
    next_index: u32,
    open: OpenBlock,
    saw_function_call: bool,
    synth_counter: usize,
}

impl GeminiToClaudeStreamState {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            started: false,
            done: false,
            next_index: 0,
            open: OpenBlock::None,
            saw_function_call: false,
            synth_counter: 0,
        }
    }

    pub fn transform_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<ClaudeStreamEvent> {
        let mut out = Vec::new();

        if !self.started {
            self.started = true;
            out.push(known(StreamEventKnown::MessageStart {
                message: StreamMessageStart {
                    id: chunk
                        .response_id
                        .clone()
                        .unwrap_or_else(|| "msg_gateway".to_string()),
                    model: chunk
                        .model_version
                        .clone()
                        .unwrap_or_else(|| self.model.clone()),
                    role: MessageRole::Assistant,
                    content: Vec::new(),
                    usage: ClaudeUsage::default(),
                    stop_reason: None,
                },
            }));
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return out;
        };

        if let Some(content) = candidate.content {
            for part in content.parts {
                if let Some(text) = part.text {
                    if text.is_empty() {
                        continue;
                    }
                    if part.thought == Some(true) {
                        self.ensure_thinking_block(&mut out);
                        let index = self.open_index();
                        out.push(known(StreamEventKnown::ContentBlockDelta {
                            index,
                            delta: ContentBlockDelta::ThinkingDelta { thinking: text },
                        }));
                    } else {
                        self.ensure_text_block(&mut out);
                        let index = self.open_index();
                        out.push(known(StreamEventKnown::ContentBlockDelta {
                            index,
                            delta: ContentBlockDelta::TextDelta { text },
                        }));
                    }
                } else if let Some(call) = part.function_call {
                    self.saw_function_call = true;
                    self.close_open_block(&mut out);
                    let index = self.next_index;
                    self.next_index += 1;
                    let id = call.id.unwrap_or_else(|| {
                        let id = format!("toolu_{:03}", self.synth_counter);
                        self.synth_counter += 1;
                        id
                    });
                    let args = call.args.unwrap_or_else(|| json!({}));
                    out.push(known(StreamEventKnown::ContentBlockStart {
                        index,
                        content_block: ClaudeBlock::ToolUse {
                            id,
                            name: call.name,
                            input: json!({}),
                        },
                    }));
                    out.push(known(StreamEventKnown::ContentBlockDelta {
                        index,
                        delta: ContentBlockDelta::InputJsonDelta {
                            partial_json: args.to_string(),
                        },
                    }));
                    out.push(known(StreamEventKnown::ContentBlockStop { index }));
                }
            }
        }

        if let Some(finish_reason) = candidate.finish_reason {
            self.done = true;
            self.close_open_block(&mut out);
            out.push(known(StreamEventKnown::MessageDelta {
                delta: StreamMessageDelta {
                    stop_reason: Some(map_finish_reason(finish_reason, self.saw_function_call)),
                    stop_sequence: None,
                },
                usage: chunk
                    .usage_metadata
                    .as_ref()
                    .map(map_usage)
                    .unwrap_or_default(),
            }));
            out.push(known(StreamEventKnown::MessageStop));
        }

        out
    }

    /// Gemini streams normally end with a finishReason chunk; close out the
    /// message if the upstream dropped without one.
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
        };
        self.open = OpenBlock::None;
        out.push(known(StreamEventKnown::ContentBlockStop { index }));
    }

    fn open_index(&self) -> u32 {
        match self.open {
            OpenBlock::None => 0,
            OpenBlock::Text(index) | OpenBlock::Thinking(index) => index,
        }
    }
}

fn known(event: StreamEventKnown) -> ClaudeStreamEvent {
    ClaudeStreamEvent::Known(event)
}
