use aigw_protocol::claude::models::{
    ModelInfo, ModelListResponse as ClaudeModelListResponse, ModelObjectType,
};
use aigw_protocol::gemini::models::ModelListResponse as GeminiModelListResponse;

/// Convert a Gemini model list into the Claude list-models shape.
pub fn transform_response(response: GeminiModelListResponse) -> ClaudeModelListResponse {
    let data: Vec<ModelInfo> = response
        .models
        .into_iter()
        .map(|model| {
            let id = model.bare_id().to_string();
            ModelInfo {
                display_name: model.display_name.or_else(|| Some(id.clone())),
                created_at: None,
                id,
                r#type: ModelObjectType::Model,
            }
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
