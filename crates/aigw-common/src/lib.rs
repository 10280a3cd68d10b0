mod errors;
mod merge;

pub use errors::{ErrorCode, GatewayError};
pub use merge::{CallConfig, CallConfigPatch, merge_call_config};
