use aigw_protocol::claude::models::ModelListResponse as ClaudeModelListResponse;
use aigw_protocol::gemini::models::{ModelInfo, ModelListResponse as GeminiModelListResponse};

/// Convert a Claude model list into the Gemini list-models shape.
pub fn transform_response(response: ClaudeModelListResponse) -> GeminiModelListResponse {
    let models = response
        .data
        .into_iter()
        .map(|model| ModelInfo {
            name: format!("models/{}", model.id),
            display_name: model.display_name.or(Some(model.id)),
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
