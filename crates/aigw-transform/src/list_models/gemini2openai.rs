use aigw_protocol::gemini::models::ModelListResponse as GeminiModelListResponse;
use aigw_protocol::openai::models::{
    ListObjectType, Model, ModelListResponse as OpenAIModelListResponse, ModelObjectType,
};

use crate::dispatch::now_unix;

/// Convert a Gemini model list into the OpenAI list-models shape.
pub fn transform_response(response: GeminiModelListResponse) -> OpenAIModelListResponse {
    let created = now_unix();
    let data = response
        .models
        .into_iter()
        .map(|model| Model {
            id: model.bare_id().to_string(),
            object: ModelObjectType::Model,
            created,
            owned_by: "google".to_string(),
        })
        .collect();

    OpenAIModelListResponse {
        object: ListObjectType::List,
        data,
    }
}
