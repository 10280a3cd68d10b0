//! Protocol converter family.
//!
//! One module per translation direction under `generate_content/` and
//! `list_models/`; `dispatch` owns the typed protocol tags and routes a
//! payload to the right direction, failing loudly on unsupported pairs.

pub mod dispatch;
pub mod generate_content;
pub mod list_models;
pub mod reasoning;
pub mod schema;

#[cfg(test)]
mod tests;

pub use dispatch::{
    GeminiGenerateRequest, GenerateRequest, GenerateResponse, ModelList, Proto, StreamChunk,
    StreamFormat, StreamTransformer, TransformError, convert_model_list, convert_request,
    convert_response, stream_format,
};
