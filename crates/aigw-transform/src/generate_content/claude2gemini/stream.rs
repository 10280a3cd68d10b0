use std::collections::BTreeMap;

use aigw_protocol::claude::stream::{
    ContentBlockDelta, StreamEvent as ClaudeStreamEvent, StreamEventKnown,
};
use aigw_protocol::claude::types::ContentBlock as ClaudeBlock;
use aigw_protocol::gemini::generate_content::{Candidate, GenerateContentResponse};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FinishReason, FunctionCall, Part, UsageMetadata,
};
use serde_json::json;

use super::response::{map_stop_reason, map_usage};

#[derive(Debug, Clone)]
struct PendingTool {
    id: String,
    name: String,
    args_json: String,
}

/// Translates a Claude event stream into Gemini streaming chunks.
///
/// Tool-call arguments arrive as partial JSON; Gemini functionCall parts
/// carry complete args, so calls are buffered until their block stops.
#[derive(Debug, Clone, Default)]
pub struct ClaudeToGeminiStreamState {
    id: Option<String>,
    model: Option<String>,
    pending_tools: BTreeMap<u32, PendingTool>,
}

impl ClaudeToGeminiStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform_event(&mut self, event: ClaudeStreamEvent) -> Vec<GenerateContentResponse> {
        let event = match event {
            ClaudeStreamEvent::Known(event) => event,
            ClaudeStreamEvent::Unknown(_) => return Vec::new(),
        };

        match event {
            StreamEventKnown::MessageStart { message } => {
                self.id = Some(message.id);
                self.model = Some(message.model);
                Vec::new()
            }
            StreamEventKnown::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                ClaudeBlock::Text { text } if !text.is_empty() => {
                    vec![self.part_chunk(Part::text(text))]
                }
                ClaudeBlock::Thinking { thinking, .. } if !thinking.is_empty() => {
                    vec![self.part_chunk(Part::thought_text(thinking))]
                }
                ClaudeBlock::ToolUse { id, name, .. } => {
                    self.pending_tools.insert(
                        index,
                        PendingTool {
                            id,
                            name,
                            args_json: String::new(),
                        },
                    );
                    Vec::new()
                }
                _ => Vec::new(),
            },
            StreamEventKnown::ContentBlockDelta { index, delta } => match delta {
                ContentBlockDelta::TextDelta { text } if !text.is_empty() => {
                    vec![self.part_chunk(Part::text(text))]
                }
                ContentBlockDelta::ThinkingDelta { thinking } if !thinking.is_empty() => {
                    vec![self.part_chunk(Part::thought_text(thinking))]
                }
                ContentBlockDelta::InputJsonDelta { partial_json } => {
                    if let Some(tool) = self.pending_tools.get_mut(&index) {
                        tool.args_json.push_str(&partial_json);
                    }
                    Vec::new()
                }
                _ => Vec::new(),
            },
            StreamEventKnown::ContentBlockStop { index } => {
                match self.pending_tools.remove(&index) {
                    Some(tool) => {
                        let args = if tool.args_json.is_empty() {
                            json!({})
                        } else {
                            serde_json::from_str(&tool.args_json).unwrap_or_else(|_| {
                                tracing::warn!(
                                    tool = %tool.name,
                                    "tool arguments were not valid JSON; substituting empty args"
                                );
                                json!({})
                            })
                        };
                        vec![self.part_chunk(Part::function_call(FunctionCall {
                            id: Some(tool.id),
                            name: tool.name,
                            args: Some(args),
                        }))]
                    }
                    None => Vec::new(),
                }
            }
            StreamEventKnown::MessageDelta { delta, usage } => {
                let finish_reason = delta.stop_reason.map(map_stop_reason);
                vec![self.terminal_chunk(finish_reason, Some(map_usage(&usage)))]
            }
            StreamEventKnown::MessageStop => Vec::new(),
            StreamEventKnown::Ping => Vec::new(),
            StreamEventKnown::Error { error } => {
                tracing::warn!(?error, "upstream stream error event");
                Vec::new()
            }
        }
    }

    pub fn finish(&mut self) -> Vec<GenerateContentResponse> {
        Vec::new()
    }

    fn part_chunk(&self, part: Part) -> GenerateContentResponse {
        self.chunk(Some(part), None, None)
    }

    fn terminal_chunk(
        &self,
        finish_reason: Option<FinishReason>,
        usage: Option<UsageMetadata>,
    ) -> GenerateContentResponse {
        self.chunk(None, finish_reason, usage)
    }

    fn chunk(
        &self,
        part: Option<Part>,
        finish_reason: Option<FinishReason>,
        usage: Option<UsageMetadata>,
    ) -> GenerateContentResponse {
        let content = part.map(|part| Content {
            role: Some(ContentRole::Model),
            parts: vec![part],
        });
        GenerateContentResponse {
            candidates: vec![Candidate {
                content,
                finish_reason,
                index: Some(0),
            }],
            usage_metadata: usage,
            model_version: self.model.clone(),
            response_id: self.id.clone(),
        }
    }
}
