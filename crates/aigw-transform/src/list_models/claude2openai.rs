use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use aigw_protocol::claude::models::ModelListResponse as ClaudeModelListResponse;
use aigw_protocol::openai::models::{
    ListObjectType, Model, ModelListResponse as OpenAIModelListResponse, ModelObjectType,
};

use crate::dispatch::now_unix;

/// Convert a Claude model list into the OpenAI list-models shape.
pub fn transform_response(response: ClaudeModelListResponse) -> OpenAIModelListResponse {
    let data = response
        .data
        .into_iter()
        .map(|model| Model {
            created: model
                .created_at
                .as_deref()
                .and_then(|created_at| OffsetDateTime::parse(created_at, &Rfc3339).ok())
                .map(|created_at| created_at.unix_timestamp())
                .unwrap_or_else(now_unix),
            id: model.id,
            object: ModelObjectType::Model,
            owned_by: "anthropic".to_string(),
        })
        .collect();

    OpenAIModelListResponse {
        object: ListObjectType::List,
        data,
    }
}
