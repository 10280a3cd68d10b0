use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use aigw_protocol::claude::models::{
    ModelInfo, ModelListResponse as ClaudeModelListResponse, ModelObjectType,
};
use aigw_protocol::openai::models::ModelListResponse as OpenAIModelListResponse;

/// Convert an OpenAI model list into the Claude list-models shape.
pub fn transform_response(response: OpenAIModelListResponse) -> ClaudeModelListResponse {
    let data: Vec<ModelInfo> = response
        .data
        .into_iter()
        .map(|model| ModelInfo {
            created_at: OffsetDateTime::from_unix_timestamp(model.created)
                .ok()
                .and_then(|created| created.format(&Rfc3339).ok()),
            display_name: Some(model.id.clone()),
            id: model.id,
            r#type: ModelObjectType::Model,
        })
        .collect();

    let first_id = data.first().map(|model| model.id.clone());
    let last_id = data.last().map(|model| model.id.clone());

    ClaudeModelListResponse {
        data,
        has_more: false,
        first_id,
        last_id,
    }
}
