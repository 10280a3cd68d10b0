use aigw_protocol::claude::messages::MessagesResponse;
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, KnownStopReason, StopReason, Usage as ClaudeUsage,
};
use aigw_protocol::gemini::generate_content::{Candidate, GenerateContentResponse};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FinishReason, FunctionCall, KnownFinishReason, Part, UsageMetadata,
};

/// Convert a Claude messages response into a Gemini generateContent response.
pub fn transform_response(response: MessagesResponse) -> GenerateContentResponse {
    let mut parts = Vec::new();
    for block in &response.content {
        match block {
            ClaudeBlock::Text { text } => parts.push(Part::text(text.clone())),
            ClaudeBlock::Thinking { thinking, .. } => {
                parts.push(Part::thought_text(thinking.clone()))
            }
            ClaudeBlock::RedactedThinking { .. } => {}
            ClaudeBlock::ToolUse { id, name, input } => {
                parts.push(Part::function_call(FunctionCall {
                    id: Some(id.clone()),
                    name: name.clone(),
                    args: Some(input.clone()),
                }))
            }
            other => {
                tracing::warn!(?other, "skipping response block with no gemini equivalent");
            }
        }
    }

    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some(ContentRole::Model),
                parts,
            }),
            finish_reason: response.stop_reason.map(map_stop_reason),
            index: Some(0),
        }],
        usage_metadata: Some(map_usage(&response.usage)),
        model_version: Some(response.model),
        response_id: Some(response.id),
    }
}

pub(crate) fn map_stop_reason(reason: StopReason) -> FinishReason {
    match reason {
        StopReason::Known(known) => FinishReason::Known(match known {
            KnownStopReason::EndTurn
            | KnownStopReason::StopSequence
            | KnownStopReason::ToolUse
            | KnownStopReason::PauseTurn => KnownFinishReason::Stop,
            KnownStopReason::MaxTokens => KnownFinishReason::MaxTokens,
            KnownStopReason::Refusal => KnownFinishReason::Safety,
        }),
        StopReason::Other(other) => FinishReason::Other(other),
    }
}

pub(crate) fn map_usage(usage: &ClaudeUsage) -> UsageMetadata {
    let prompt = usage.input_tokens.unwrap_or(0) as i64;
    let output = usage.output_tokens.unwrap_or(0) as i64;
    UsageMetadata {
        prompt_token_count: Some(prompt),
        candidates_token_count: Some(output),
        thoughts_token_count: None,
        total_token_count: Some(prompt + output),
    }
}
