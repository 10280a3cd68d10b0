use serde::{Deserialize, Serialize};

use aigw_common::GatewayError;
use aigw_protocol::claude::messages::{MessagesRequest, MessagesResponse};
use aigw_protocol::claude::models::ModelListResponse as ClaudeModelListResponse;
use aigw_protocol::claude::stream::StreamEvent as ClaudeStreamEvent;
use aigw_protocol::gemini::generate_content::{GenerateContentRequest, GenerateContentResponse};
use aigw_protocol::gemini::models::ModelListResponse as GeminiModelListResponse;
use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::response::ChatCompletionResponse;
use aigw_protocol::openai::chat_completions::stream::ChatCompletionChunk;
use aigw_protocol::openai::models::ModelListResponse as OpenAIModelListResponse;
use aigw_protocol::openai::responses::request::ResponseRequest;
use aigw_protocol::openai::responses::response::Response as OpenAIResponse;
use aigw_protocol::openai::responses::stream::ResponseStreamEvent;

use crate::generate_content;
use crate::list_models;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Proto {
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "openai")]
    OpenAIChat,
    #[serde(rename = "openai-responses")]
    OpenAIResponse,
    #[serde(rename = "gemini")]
    Gemini,
}

impl Proto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proto::Claude => "claude",
            Proto::OpenAIChat => "openai",
            Proto::OpenAIResponse => "openai-responses",
            Proto::Gemini => "gemini",
        }
    }
}

/// How a dialect frames its stream on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFormat {
    SseNamedEvent,
    SseDataOnly,
    JsonStream,
}

pub fn stream_format(proto: Proto) -> StreamFormat {
    match proto {
        Proto::Claude => StreamFormat::SseNamedEvent,
        Proto::OpenAIChat => StreamFormat::SseDataOnly,
        Proto::OpenAIResponse => StreamFormat::SseNamedEvent,
        Proto::Gemini => StreamFormat::JsonStream,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// No translation exists for this (source, target) pair.
    UnsupportedTarget { src: Proto, dst: Proto },
    /// Payload variant does not match its declared protocol.
    ProtoMismatch,
}

impl From<TransformError> for GatewayError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::UnsupportedTarget { src, dst } => GatewayError::unsupported_protocol(
                format!(
                    "unsupported target protocol: {} -> {}",
                    src.as_str(),
                    dst.as_str()
                ),
            ),
            TransformError::ProtoMismatch => {
                GatewayError::unsupported_protocol("payload does not match declared protocol")
            }
        }
    }
}

/// Gemini carries the model in the URL, not the body; the dispatch layer
/// keeps them together.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiGenerateRequest {
    pub model: String,
    pub body: GenerateContentRequest,
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateRequest {
    Claude(MessagesRequest),
    OpenAIChat(ChatCompletionRequest),
    OpenAIResponse(ResponseRequest),
    Gemini(GeminiGenerateRequest),
}

impl GenerateRequest {
    pub fn proto(&self) -> Proto {
        match self {
            GenerateRequest::Claude(_) => Proto::Claude,
            GenerateRequest::OpenAIChat(_) => Proto::OpenAIChat,
            GenerateRequest::OpenAIResponse(_) => Proto::OpenAIResponse,
            GenerateRequest::Gemini(_) => Proto::Gemini,
        }
    }
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateResponse {
    Claude(MessagesResponse),
    OpenAIChat(ChatCompletionResponse),
    OpenAIResponse(OpenAIResponse),
    Gemini(GenerateContentResponse),
}

impl GenerateResponse {
    pub fn proto(&self) -> Proto {
        match self {
            GenerateResponse::Claude(_) => Proto::Claude,
            GenerateResponse::OpenAIChat(_) => Proto::OpenAIChat,
            GenerateResponse::OpenAIResponse(_) => Proto::OpenAIResponse,
            GenerateResponse::Gemini(_) => Proto::Gemini,
        }
    }
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Claude(ClaudeStreamEvent),
    OpenAIChat(ChatCompletionChunk),
    OpenAIResponse(ResponseStreamEvent),
    Gemini(GenerateContentResponse),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelList {
    Claude(ClaudeModelListResponse),
    OpenAI(OpenAIModelListResponse),
    Gemini(GeminiModelListResponse),
}

/// Translate an inbound request into the target dialect.
///
/// The OpenAI Responses dialect is target-only on the request path: it can
/// be converted to, never from (other than identity).
pub fn convert_request(
    req: GenerateRequest,
    dst: Proto,
) -> Result<GenerateRequest, TransformError> {
    let src = req.proto();
    if src == dst {
        return Ok(req);
    }

    let converted = match (req, dst) {
        (GenerateRequest::Claude(req), Proto::OpenAIChat) => GenerateRequest::OpenAIChat(
            generate_content::claude2openai_chat::request::transform_request(req),
        ),
        (GenerateRequest::Claude(req), Proto::Gemini) => GenerateRequest::Gemini(
            generate_content::claude2gemini::request::transform_request(req),
        ),
        (GenerateRequest::Claude(req), Proto::OpenAIResponse) => GenerateRequest::OpenAIResponse(
            generate_content::claude2openai_response::request::transform_request(req),
        ),
        (GenerateRequest::OpenAIChat(req), Proto::Claude) => GenerateRequest::Claude(
            generate_content::openai_chat2claude::request::transform_request(req),
        ),
        (GenerateRequest::OpenAIChat(req), Proto::Gemini) => GenerateRequest::Gemini(
            generate_content::openai_chat2gemini::request::transform_request(req),
        ),
        (GenerateRequest::OpenAIChat(req), Proto::OpenAIResponse) => {
            GenerateRequest::OpenAIResponse(
                generate_content::openai_chat2openai_response::request::transform_request(req),
            )
        }
        (GenerateRequest::Gemini(req), Proto::Claude) => GenerateRequest::Claude(
            generate_content::gemini2claude::request::transform_request(req),
        ),
        (GenerateRequest::Gemini(req), Proto::OpenAIChat) => GenerateRequest::OpenAIChat(
            generate_content::gemini2openai_chat::request::transform_request(req),
        ),
        (GenerateRequest::Gemini(req), Proto::OpenAIResponse) => GenerateRequest::OpenAIResponse(
            generate_content::gemini2openai_response::request::transform_request(req),
        ),
        (_, dst) => return Err(TransformError::UnsupportedTarget { src, dst }),
    };
    Ok(converted)
}

/// Translate a backend response into the caller's dialect.
///
/// `model` is the model name the caller asked for; it backfills dialects
/// whose responses do not carry one (Gemini).
pub fn convert_response(
    resp: GenerateResponse,
    dst: Proto,
    model: &str,
) -> Result<GenerateResponse, TransformError> {
    let src = resp.proto();
    if src == dst {
        return Ok(resp);
    }

    let converted = match (resp, dst) {
        (GenerateResponse::Claude(resp), Proto::OpenAIChat) => GenerateResponse::OpenAIChat(
            generate_content::claude2openai_chat::response::transform_response(resp),
        ),
        (GenerateResponse::Claude(resp), Proto::Gemini) => GenerateResponse::Gemini(
            generate_content::claude2gemini::response::transform_response(resp),
        ),
        (GenerateResponse::OpenAIChat(resp), Proto::Claude) => GenerateResponse::Claude(
            generate_content::openai_chat2claude::response::transform_response(resp),
        ),
        (GenerateResponse::OpenAIChat(resp), Proto::Gemini) => GenerateResponse::Gemini(
            generate_content::openai_chat2gemini::response::transform_response(resp),
        ),
        (GenerateResponse::Gemini(resp), Proto::Claude) => GenerateResponse::Claude(
            generate_content::gemini2claude::response::transform_response(resp, model),
        ),
        (GenerateResponse::Gemini(resp), Proto::OpenAIChat) => GenerateResponse::OpenAIChat(
            generate_content::gemini2openai_chat::response::transform_response(resp, model),
        ),
        (GenerateResponse::OpenAIResponse(resp), Proto::Claude) => GenerateResponse::Claude(
            generate_content::openai_response2claude::response::transform_response(resp),
        ),
        (GenerateResponse::OpenAIResponse(resp), Proto::OpenAIChat) => {
            GenerateResponse::OpenAIChat(
                generate_content::openai_response2openai_chat::response::transform_response(resp),
            )
        }
        (GenerateResponse::OpenAIResponse(resp), Proto::Gemini) => GenerateResponse::Gemini(
            generate_content::openai_response2gemini::response::transform_response(resp),
        ),
        (_, dst) => return Err(TransformError::UnsupportedTarget { src, dst }),
    };
    Ok(converted)
}

/// Translate a model-list response into the caller's dialect.
/// The Responses dialect shares OpenAI's `/v1/models` shape.
pub fn convert_model_list(list: ModelList, dst: Proto) -> Result<ModelList, TransformError> {
    let converted = match (list, dst) {
        (list @ ModelList::Claude(_), Proto::Claude) => list,
        (list @ ModelList::OpenAI(_), Proto::OpenAIChat | Proto::OpenAIResponse) => list,
        (list @ ModelList::Gemini(_), Proto::Gemini) => list,
        (ModelList::Claude(list), Proto::OpenAIChat | Proto::OpenAIResponse) => {
            ModelList::OpenAI(list_models::claude2openai::transform_response(list))
        }
        (ModelList::Claude(list), Proto::Gemini) => {
            ModelList::Gemini(list_models::claude2gemini::transform_response(list))
        }
        (ModelList::OpenAI(list), Proto::Claude) => {
            ModelList::Claude(list_models::openai2claude::transform_response(list))
        }
        (ModelList::OpenAI(list), Proto::Gemini) => {
            ModelList::Gemini(list_models::openai2gemini::transform_response(list))
        }
        (ModelList::Gemini(list), Proto::Claude) => {
            ModelList::Claude(list_models::gemini2claude::transform_response(list))
        }
        (ModelList::Gemini(list), Proto::OpenAIChat | Proto::OpenAIResponse) => {
            ModelList::OpenAI(list_models::gemini2openai::transform_response(list))
        }
    };
    Ok(converted)
}

/// Stateful per-direction stream translator.
///
/// One source event maps to zero or more target events; `finish` drains
/// whatever terminal events the target dialect still owes once the source
/// stream ends.
pub enum StreamTransformer {
    Passthrough(Proto),
    ClaudeToOpenAIChat(generate_content::claude2openai_chat::stream::ClaudeToOpenAIChatStreamState),
    ClaudeToGemini(generate_content::claude2gemini::stream::ClaudeToGeminiStreamState),
    OpenAIChatToClaude(generate_content::openai_chat2claude::stream::OpenAIChatToClaudeStreamState),
    OpenAIChatToGemini(generate_content::openai_chat2gemini::stream::OpenAIChatToGeminiStreamState),
    GeminiToClaude(generate_content::gemini2claude::stream::GeminiToClaudeStreamState),
    GeminiToOpenAIChat(generate_content::gemini2openai_chat::stream::GeminiToOpenAIChatStreamState),
    OpenAIResponseToClaude(
        generate_content::openai_response2claude::stream::OpenAIResponseToClaudeStreamState,
    ),
    OpenAIResponseToOpenAIChat(
        generate_content::openai_response2openai_chat::stream::OpenAIResponseToOpenAIChatStreamState,
    ),
    OpenAIResponseToGemini(
        generate_content::openai_response2gemini::stream::OpenAIResponseToGeminiStreamState,
    ),
}

impl StreamTransformer {
    /// `model` backfills message skeletons for dialects whose chunks do not
    /// carry a model name.
    pub fn new(src: Proto, dst: Proto, model: &str) -> Result<Self, TransformError> {
        if src == dst {
            return Ok(StreamTransformer::Passthrough(src));
        }

        let transformer = match (src, dst) {
            (Proto::Claude, Proto::OpenAIChat) => StreamTransformer::ClaudeToOpenAIChat(
                generate_content::claude2openai_chat::stream::ClaudeToOpenAIChatStreamState::new(
                    now_unix(),
                ),
            ),
            (Proto::Claude, Proto::Gemini) => StreamTransformer::ClaudeToGemini(
                generate_content::claude2gemini::stream::ClaudeToGeminiStreamState::new(),
            ),
            (Proto::OpenAIChat, Proto::Claude) => StreamTransformer::OpenAIChatToClaude(
                generate_content::openai_chat2claude::stream::OpenAIChatToClaudeStreamState::new(),
            ),
            (Proto::OpenAIChat, Proto::Gemini) => StreamTransformer::OpenAIChatToGemini(
                generate_content::openai_chat2gemini::stream::OpenAIChatToGeminiStreamState::new(),
            ),
            (Proto::Gemini, Proto::Claude) => StreamTransformer::GeminiToClaude(
                generate_content::gemini2claude::stream::GeminiToClaudeStreamState::new(model),
            ),
            (Proto::Gemini, Proto::OpenAIChat) => StreamTransformer::GeminiToOpenAIChat(
                generate_content::gemini2openai_chat::stream::GeminiToOpenAIChatStreamState::new(
                    model,
                    now_unix(),
                ),
            ),
            (Proto::OpenAIResponse, Proto::Claude) => StreamTransformer::OpenAIResponseToClaude(
                generate_content::openai_response2claude::stream::OpenAIResponseToClaudeStreamState::new(),
            ),
            (Proto::OpenAIResponse, Proto::OpenAIChat) => {
                StreamTransformer::OpenAIResponseToOpenAIChat(
                    generate_content::openai_response2openai_chat::stream::OpenAIResponseToOpenAIChatStreamState::new(now_unix()),
                )
            }
            (Proto::OpenAIResponse, Proto::Gemini) => StreamTransformer::OpenAIResponseToGemini(
                generate_content::openai_response2gemini::stream::OpenAIResponseToGeminiStreamState::new(model),
            ),
            (src, dst) => return Err(TransformError::UnsupportedTarget { src, dst }),
        };
        Ok(transformer)
    }

    pub fn transform_chunk(
        &mut self,
        chunk: StreamChunk,
    ) -> Result<Vec<StreamChunk>, TransformError> {
        match (self, chunk) {
            (StreamTransformer::Passthrough(proto), chunk) => {
                let matches = matches!(
                    (&chunk, *proto),
                    (StreamChunk::Claude(_), Proto::Claude)
                        | (StreamChunk::OpenAIChat(_), Proto::OpenAIChat)
                        | (StreamChunk::OpenAIResponse(_), Proto::OpenAIResponse)
                        | (StreamChunk::Gemini(_), Proto::Gemini)
                );
                if matches {
                    Ok(vec![chunk])
                } else {
                    Err(TransformError::ProtoMismatch)
                }
            }
            (StreamTransformer::ClaudeToOpenAIChat(state), StreamChunk::Claude(event)) => Ok(state
                .transform_event(event)
                .into_iter()
                .map(StreamChunk::OpenAIChat)
                .collect()),
            (StreamTransformer::ClaudeToGemini(state), StreamChunk::Claude(event)) => Ok(state
                .transform_event(event)
                .into_iter()
                .map(StreamChunk::Gemini)
                .collect()),
            (StreamTransformer::OpenAIChatToClaude(state), StreamChunk::OpenAIChat(chunk)) => {
                Ok(state
                    .transform_chunk(chunk)
                    .into_iter()
                    .map(StreamChunk::Claude)
                    .collect())
            }
            (StreamTransformer::OpenAIChatToGemini(state), StreamChunk::OpenAIChat(chunk)) => {
                Ok(state
                    .transform_chunk(chunk)
                    .into_iter()
                    .map(StreamChunk::Gemini)
                    .collect())
            }
            (StreamTransformer::GeminiToClaude(state), StreamChunk::Gemini(chunk)) => Ok(state
                .transform_chunk(chunk)
                .into_iter()
                .map(StreamChunk::Claude)
                .collect()),
            (StreamTransformer::GeminiToOpenAIChat(state), StreamChunk::Gemini(chunk)) => Ok(state
                .transform_chunk(chunk)
                .into_iter()
                .map(StreamChunk::OpenAIChat)
                .collect()),
            (
                StreamTransformer::OpenAIResponseToClaude(state),
                StreamChunk::OpenAIResponse(event),
            ) => Ok(state
                .transform_event(event)
                .into_iter()
                .map(StreamChunk::Claude)
                .collect()),
            (
                StreamTransformer::OpenAIResponseToOpenAIChat(state),
                StreamChunk::OpenAIResponse(event),
            ) => Ok(state
                .transform_event(event)
                .into_iter()
                .map(StreamChunk::OpenAIChat)
                .collect()),
            (
                StreamTransformer::OpenAIResponseToGemini(state),
                StreamChunk::OpenAIResponse(event),
            ) => Ok(state
                .transform_event(event)
                .into_iter()
                .map(StreamChunk::Gemini)
                .collect()),
            _ => Err(TransformError::ProtoMismatch),
        }
    }

    /// Drain terminal events once the source stream has ended.
    pub fn finish(&mut self) -> Vec<StreamChunk> {
        match self {
            StreamTransformer::Passthrough(_) => Vec::new(),
            StreamTransformer::ClaudeToOpenAIChat(state) => state
                .finish()
                .into_iter()
                .map(StreamChunk::OpenAIChat)
                .collect(),
            StreamTransformer::ClaudeToGemini(state) => {
                state.finish().into_iter().map(StreamChunk::Gemini).collect()
            }
            StreamTransformer::OpenAIChatToClaude(state) => {
                state.finish().into_iter().map(StreamChunk::Claude).collect()
            }
            StreamTransformer::OpenAIChatToGemini(state) => {
                state.finish().into_iter().map(StreamChunk::Gemini).collect()
            }
            StreamTransformer::GeminiToClaude(state) => {
                state.finish().into_iter().map(StreamChunk::Claude).collect()
            }
            StreamTransformer::GeminiToOpenAIChat(state) => state
                .finish()
                .into_iter()
                .map(StreamChunk::OpenAIChat)
                .collect(),
            StreamTransformer::OpenAIResponseToClaude(state) => {
                state.finish().into_iter().map(StreamChunk::Claude).collect()
            }
            StreamTransformer::OpenAIResponseToOpenAIChat(state) => state
                .finish()
                .into_iter()
                .map(StreamChunk::OpenAIChat)
                .collect(),
            StreamTransformer::OpenAIResponseToGemini(state) => {
                state.finish().into_iter().map(StreamChunk::Gemini).collect()
            }
        }
    }
}

pub(crate) fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
