use aigw_protocol::gemini::models::{ModelInfo, ModelListResponse as GeminiModelListResponse};
use aigw_protocol::openai::models::ModelListResponse as OpenAIModelListResponse;

/// Convert an OpenAI model list into the Gemini list-models shape.
pub fn transform_response(response: OpenAIModelListResponse) -> GeminiModelListResponse {
    let models = response
        .data
        .into_iter()
        .map(|model| ModelInfo {
            name: format!("models/{}", model.id),
            display_name: Some(model.id),
            description: None,
            version: None,
            input_token_limit: None,
            output_token_limit: None,
            supported_generation_methods: Some(vec![
                "generateContent".to_string(),
                "streamGenerateContent".to_string(),
            ]),
        })
        .collect();

    GeminiModelListResponse {
        models,
        next_page_token: None,
    }
}
