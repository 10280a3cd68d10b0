use aigw_protocol::gemini::generate_content::GenerateContentResponse;
use aigw_protocol::openai::chat_completions::stream::{
    ChatCompletionChunk, ChatCompletionChunkObjectType, StreamChoice, StreamDelta, StreamRole,
    ToolCallChunk, ToolCallChunkFunction,
};
use aigw_protocol::openai::chat_completions::types::{FinishReason, ToolCallType, Usage};

use super::response::{map_finish_reason, map_usage};

/// Translates a Gemini streaming response into OpenAI chat-completion
/// chunks.
#[derive(Debug, Clone)]
pub struct GeminiToOpenAIChatStreamState {
    id: Option<String>,
    model: String,
    created: i64,
    started: bool,
    done: bool,
    next_tool_ordinal: i64,
    saw_function_call: bool,
}

impl GeminiToOpenAIChatStreamState {
    pub fn new(model: &str, created: i64) -> Self {
        Self {
            id: None,
            model: model.to_string(),
            created,
            started: false,
            done: false,
            next_tool_ordinal: 0,
            saw_function_call: false,
        }
    }

    pub fn transform_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<ChatCompletionChunk> {
        if self.id.is_none() {
            self.id = chunk.response_id.clone();
        }
        if let Some(version) = &chunk.model_version {
            self.model = version.clone();
        }

        let mut out = Vec::new();
        if !self.started {
            self.started = true;
            out.push(self.chunk(
                StreamDelta {
                    role: Some(StreamRole::Assistant),
                    ..StreamDelta::default()
                },
                None,
                None,
            ));
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
                    let delta = if part.thought == Some(true) {
                        StreamDelta {
                            reasoning_content: Some(text),
                            ..StreamDelta::default()
                        }
                    } else {
                        StreamDelta {
                            content: Some(text),
                            ..StreamDelta::default()
                        }
                    };
                    out.push(self.chunk(delta, None, None));
                } else if let Some(call) = part.function_call {
                    self.saw_function_call = true;
                    let ordinal = self.next_tool_ordinal;
                    self.next_tool_ordinal += 1;
                    let tool_call = ToolCallChunk {
                        index: ordinal,
                        id: Some(call.id.unwrap_or_else(|| format!("call_{ordinal:03}"))),
                        r#type: Some(ToolCallType::Function),
                        function: Some(ToolCallChunkFunction {
                            name: Some(call.name),
                            arguments: Some(
                                call.args
                                    .map(|args| args.to_string())
                                    .unwrap_or_else(|| "{}".to_string()),
                            ),
                        }),
                    };
                    out.push(self.chunk(
                        StreamDelta {
                            tool_calls: Some(vec![tool_call]),
                            ..StreamDelta::default()
                        },
                        None,
                        None,
                    ));
                }
            }
        }

        if let Some(finish_reason) = candidate.finish_reason {
            self.done = true;
            out.push(self.chunk(
                StreamDelta::default(),
                Some(map_finish_reason(finish_reason, self.saw_function_call)),
                chunk.usage_metadata.as_ref().map(map_usage),
            ));
        }

        out
    }

    /// Close the stream if the upstream dropped without a finishReason.
    pub fn finish(&mut self) -> Vec<ChatCompletionChunk> {
        if !self.started || self.done {
            return Vec::new();
        }
        self.done = true;
        vec![self.chunk(StreamDelta::default(), Some(FinishReason::stop()), None)]
    }

    fn chunk(
        &self,
        delta: StreamDelta,
        finish_reason: Option<FinishReason>,
        usage: Option<Usage>,
    ) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self
                .id
                .clone()
                .unwrap_or_else(|| "chatcmpl-gateway".to_string()),
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
