use aigw_protocol::gemini::generate_content::{Candidate, GenerateContentResponse};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FinishReason as GeminiFinishReason, FunctionCall, Part, UsageMetadata,
};
use aigw_protocol::openai::chat_completions::stream::{ChatCompletionChunk, ToolCallChunk};
use serde_json::json;

use super::response::{map_finish_reason, map_usage};

#[derive(Debug, Clone)]
struct PendingTool {
    openai_index: i64,
    id: Option<String>,
    name: String,
    args_json: String,
}

/// Translates an OpenAI chat-completion chunk stream into Gemini chunks.
///
/// Gemini functionCall parts carry complete args, so tool-call argument
/// deltas are buffered until the call is complete; the terminal chunk
/// (finishReason + usageMetadata) is deferred to `finish` so a trailing
/// usage-only chunk still counts.
#[derive(Debug, Clone, Default)]
pub struct OpenAIChatToGeminiStreamState {
    id: Option<String>,
    model: Option<String>,
    pending_tool: Option<PendingTool>,
    pending_finish: Option<GeminiFinishReason>,
    usage: Option<UsageMetadata>,
    done: bool,
    started: bool,
}

impl OpenAIChatToGeminiStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<GenerateContentResponse> {
        self.started = true;
        if self.id.is_none() {
            self.id = Some(chunk.id.clone());
        }
        if self.model.is_none() {
            self.model = Some(chunk.model.clone());
        }
        if let Some(usage) = &chunk.usage {
            self.usage = Some(map_usage(usage));
        }

        let mut out = Vec::new();
        let Some(choice) = chunk.choices.into_iter().find(|choice| choice.index == 0) else {
            return out;
        };

        if let Some(reasoning) = choice.delta.reasoning_content
            && !reasoning.is_empty()
        {
            out.push(self.part_chunk(Part::thought_text(reasoning)));
        }

        if let Some(text) = choice.delta.content
            && !text.is_empty()
        {
            out.push(self.part_chunk(Part::text(text)));
        }

        if let Some(tool_calls) = choice.delta.tool_calls {
            for tool_call in tool_calls {
                self.map_tool_call_chunk(tool_call, &mut out);
            }
        }

        if let Some(finish_reason) = choice.finish_reason {
            self.pending_finish = Some(map_finish_reason(finish_reason));
        }

        out
    }

    pub fn finish(&mut self) -> Vec<GenerateContentResponse> {
        if !self.started || self.done {
            return Vec::new();
        }
        self.done = true;

        let mut out = Vec::new();
        if let Some(part) = self.flush_pending_tool() {
            out.push(self.part_chunk(part));
        }
        let finish_reason = self
            .pending_finish
            .take()
            .unwrap_or(GeminiFinishReason::stop());
        out.push(self.terminal_chunk(finish_reason));
        out
    }

    fn map_tool_call_chunk(
        &mut self,
        tool_call: ToolCallChunk,
        out: &mut Vec<GenerateContentResponse>,
    ) {
        let starts_new = tool_call.id.is_some()
            || !matches!(&self.pending_tool, Some(pending) if pending.openai_index == tool_call.index);

        if starts_new {
            if let Some(part) = self.flush_pending_tool() {
                out.push(self.part_chunk(part));
            }
            self.pending_tool = Some(PendingTool {
                openai_index: tool_call.index,
                id: tool_call.id.clone(),
                name: tool_call
                    .function
                    .as_ref()
                    .and_then(|function| function.name.clone())
                    .unwrap_or_default(),
                args_json: String::new(),
            });
        }

        if let Some(arguments) = tool_call.function.and_then(|function| function.arguments)
            && let Some(pending) = self.pending_tool.as_mut()
        {
            pending.args_json.push_str(&arguments);
        }
    }

    fn flush_pending_tool(&mut self) -> Option<Part> {
        let pending = self.pending_tool.take()?;
        let args = if pending.args_json.is_empty() {
            json!({})
        } else {
            serde_json::from_str(&pending.args_json).unwrap_or_else(|_| {
                tracing::warn!(
                    tool = %pending.name,
                    "tool call arguments were not valid JSON; substituting empty args"
                );
                json!({})
            })
        };
        Some(Part::function_call(FunctionCall {
            id: pending.id,
            name: pending.name,
            args: Some(args),
        }))
    }

    fn part_chunk(&self, part: Part) -> GenerateContentResponse {
        self.chunk(Some(part), None)
    }

    fn terminal_chunk(&self, finish_reason: GeminiFinishReason) -> GenerateContentResponse {
        let mut chunk = self.chunk(None, Some(finish_reason));
        chunk.usage_metadata = self.usage.clone();
        chunk
    }

    fn chunk(
        &self,
        part: Option<Part>,
        finish_reason: Option<GeminiFinishReason>,
    ) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: part.map(|part| Content {
                    role: Some(ContentRole::Model),
                    parts: vec![part],
                }),
                finish_reason,
                index: Some(0),
            }],
            usage_metadata: None,
            model_version: self.model.clone(),
            response_id: self.id.clone(),
        }
    }
}
