use aigw_protocol::gemini::generate_content::{Candidate, GenerateContentResponse};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FinishReason as GeminiFinishReason, Part,
};
use aigw_protocol::openai::responses::stream::{ResponseStreamEvent, ResponseStreamEventKnown};
use aigw_protocol::openai::responses::types::OutputItem;
use serde_json::json;

use super::response::{map_status, map_usage};

/// Translates an OpenAI Responses event stream into Gemini chunks.
///
/// Function-call arguments stream as deltas but Gemini functionCall parts
/// carry complete args; the call is emitted on its output_item.done event.
#[derive(Debug, Clone, Default)]
pub struct OpenAIResponseToGeminiStreamState {
    id: Option<String>,
    model: String,
    done: bool,
    started: bool,
}

impl OpenAIResponseToGeminiStreamState {
    pub fn new(model: &str) -> Self {
        Self {
            id: None,
            model: model.to_string(),
            done: false,
            started: false,
        }
    }

    pub fn transform_event(&mut self, event: ResponseStreamEvent) -> Vec<GenerateContentResponse> {
        let event = match event {
            ResponseStreamEvent::Known(event) => event,
            ResponseStreamEvent::Unknown(_) => return Vec::new(),
        };

        match event {
            ResponseStreamEventKnown::Created { response }
            | ResponseStreamEventKnown::InProgress { response } => {
                self.started = true;
                self.id = Some(response.id);
                self.model = response.model;
                Vec::new()
            }
            ResponseStreamEventKnown::OutputTextDelta { delta, .. } => {
                if delta.is_empty() {
                    Vec::new()
                } else {
                    vec![self.part_chunk(Part::text(delta))]
                }
            }
            ResponseStreamEventKnown::ReasoningSummaryTextDelta { delta, .. } => {
                if delta.is_empty() {
                    Vec::new()
                } else {
                    vec![self.part_chunk(Part::thought_text(delta))]
                }
            }
            ResponseStreamEventKnown::OutputItemDone { item, .. } => match item {
                OutputItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                    ..
                } => {
                    let args = serde_json::from_str(&arguments).unwrap_or_else(|_| {
                        tracing::warn!(tool = %name, "tool call arguments were not valid JSON; substituting empty args");
                        json!({})
                    });
                    vec![self.part_chunk(Part::function_call(
                        aigw_protocol::gemini::types::FunctionCall {
                            id: Some(call_id),
                            name,
                            args: Some(args),
                        },
                    ))]
                }
                _ => Vec::new(),
            },
            ResponseStreamEventKnown::Completed { response }
            | ResponseStreamEventKnown::Failed { response } => {
                self.done = true;
                let mut chunk = self.chunk(None, Some(map_status(&response.status)));
                chunk.usage_metadata = response.usage.as_ref().map(map_usage);
                vec![chunk]
            }
            ResponseStreamEventKnown::OutputItemAdded { .. }
            | ResponseStreamEventKnown::ContentPartAdded { .. }
            | ResponseStreamEventKnown::OutputTextDone { .. }
            | ResponseStreamEventKnown::FunctionCallArgumentsDelta { .. }
            | ResponseStreamEventKnown::FunctionCallArgumentsDone { .. } => Vec::new(),
        }
    }

    /// Close the stream if the upstream dropped without a completed event.
    pub fn finish(&mut self) -> Vec<GenerateContentResponse> {
        if !self.started || self.done {
            return Vec::new();
        }
        self.done = true;
        vec![self.chunk(None, Some(GeminiFinishReason::stop()))]
    }

    fn part_chunk(&self, part: Part) -> GenerateContentResponse {
        self.chunk(Some(part), None)
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
            model_version: Some(self.model.clone()),
            response_id: self.id.clone(),
        }
    }
}
