use aigw_protocol::gemini::generate_content::{Candidate, GenerateContentResponse};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FinishReason as GeminiFinishReason, FunctionCall,
    KnownFinishReason as GeminiKnownFinishReason, Part, UsageMetadata,
};
use aigw_protocol::openai::responses::response::Response;
use aigw_protocol::openai::responses::types::{
    KnownResponseStatus, OutputContent, OutputItem, ResponseStatus, ResponseUsage,
};
use serde_json::json;

/// Convert an OpenAI Responses response into a Gemini generateContent
/// response.
pub fn transform_response(response: Response) -> GenerateContentResponse {
    let mut parts = Vec::new();

    for item in &response.output {
        match item {
            OutputItem::Reasoning { summary, .. } => {
                for part in summary {
                    if !part.text.is_empty() {
                        parts.push(Part::thought_text(part.text.clone()));
                    }
                }
            }
            OutputItem::Message { content, .. } => {
                for part in content {
                    match part {
                        OutputContent::OutputText { text, .. } => {
                            if !text.is_empty() {
                                parts.push(Part::text(text.clone()));
                            }
                        }
                        OutputContent::Refusal { refusal } => {
                            if !refusal.is_empty() {
                                parts.push(Part::text(refusal.clone()));
                            }
                        }
                    }
                }
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
                ..
            } => {
                let args = serde_json::from_str(arguments).unwrap_or_else(|_| {
                    tracing::warn!(tool = %name, "tool call arguments were not valid JSON; substituting empty args");
                    json!({})
                });
                parts.push(Part::function_call(FunctionCall {
                    id: Some(call_id.clone()),
                    name: name.clone(),
                    args: Some(args),
                }));
            }
        }
    }

    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some(ContentRole::Model),
                parts,
            }),
            finish_reason: Some(map_status(&response.status)),
            index: Some(0),
        }],
        usage_metadata: response.usage.as_ref().map(map_usage),
        model_version: Some(response.model),
        response_id: Some(response.id),
    }
}

pub(crate) fn map_status(status: &ResponseStatus) -> GeminiFinishReason {
    match status {
        ResponseStatus::Known(known) => match known {
            KnownResponseStatus::Completed | KnownResponseStatus::InProgress => {
                GeminiFinishReason::Known(GeminiKnownFinishReason::Stop)
            }
            KnownResponseStatus::Incomplete => {
                GeminiFinishReason::Known(GeminiKnownFinishReason::MaxTokens)
            }
            KnownResponseStatus::Failed => GeminiFinishReason::Other("FAILED".to_string()),
            KnownResponseStatus::Cancelled => GeminiFinishReason::Other("CANCELLED".to_string()),
        },
        ResponseStatus::Other(other) => GeminiFinishReason::Other(other.clone()),
    }
}

pub(crate) fn map_usage(usage: &ResponseUsage) -> UsageMetadata {
    UsageMetadata {
        prompt_token_count: Some(usage.input_tokens),
        candidates_token_count: Some(usage.output_tokens),
        thoughts_token_count: usage
            .output_tokens_details
            .as_ref()
            .and_then(|details| details.reasoning_tokens),
        total_token_count: Some(usage.total_tokens),
    }
}
