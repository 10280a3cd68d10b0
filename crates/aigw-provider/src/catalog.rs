use aigw_transform::Proto;

/// Provider types carried by this gateway. Custom deployments may register
/// more; the prefix rule below still classifies their protocol family.
pub const GEMINI_CLI_OAUTH: &str = "gemini-cli-oauth";
pub const OPENAI_CUSTOM: &str = "openai-custom";
pub const OPENAI_QWEN_OAUTH: &str = "openai-qwen-oauth";
pub const OPENAI_IFLOW: &str = "openai-iflow";
pub const OPENAI_RESPONSES: &str = "openai-responses";
pub const CLAUDE_CUSTOM: &str = "claude-custom";
pub const CLAUDE_KIRO_OAUTH: &str = "claude-kiro-oauth";

/// Wire dialect a provider type speaks, derived from its name prefix.
/// Used by fallback filtering to keep chain hops within one family.
pub fn protocol_family(provider_type: &str) -> Option<Proto> {
    if provider_type == OPENAI_RESPONSES {
        return Some(Proto::OpenAIResponse);
    }
    if provider_type.starts_with("gemini") {
        Some(Proto::Gemini)
    } else if provider_type.starts_with("claude") {
        Some(Proto::Claude)
    } else if provider_type.starts_with("openai") {
        Some(Proto::OpenAIChat)
    } else {
        None
    }
}

/// Static capability table: which model names each provider type serves.
/// An empty list means "no static restriction" (accepts any model).
pub fn supported_models(provider_type: &str) -> &'static [&'static str] {
    match provider_type {
        GEMINI_CLI_OAUTH => &[
            "gemini-2.5-pro",
            "gemini-2.5-flash",
            "gemini-2.5-flash-lite",
            "gemini-2.0-flash",
        ],
        OPENAI_QWEN_OAUTH => &["qwen3-coder-plus", "qwen3-coder-flash", "qwen3-max"],
        OPENAI_IFLOW => &[
            "qwen3-max",
            "qwen3-coder-plus",
            "kimi-k2",
            "glm-4.6",
            "deepseek-v3.1",
        ],
        OPENAI_RESPONSES => &["gpt-5", "gpt-5-codex", "codex-mini-latest"],
        CLAUDE_KIRO_OAUTH => &[
            "claude-sonnet-4-5",
            "claude-sonnet-4-0",
            "claude-3-7-sonnet-20250219",
            "claude-3-5-haiku-20241022",
        ],
        _ => &[],
    }
}

/// Whether `provider_type` can serve `model` according to the static
/// table. Types with no static restriction accept everything.
pub fn supports_model(provider_type: &str, model: &str) -> bool {
    let models = supported_models(provider_type);
    models.is_empty() || models.contains(&model)
}

/// Default model used for health probes when the account has no
/// `checkModelName` override. Unknown provider types have none.
pub fn default_check_model(provider_type: &str) -> Option<&'static str> {
    match provider_type {
        GEMINI_CLI_OAUTH => Some("gemini-2.5-flash"),
        OPENAI_QWEN_OAUTH => Some("qwen3-coder-flash"),
        OPENAI_IFLOW => Some("qwen3-max"),
        OPENAI_CUSTOM => Some("gpt-4o-mini"),
        OPENAI_RESPONSES => Some("codex-mini-latest"),
        CLAUDE_CUSTOM | CLAUDE_KIRO_OAUTH => Some("claude-3-5-haiku-20241022"),
        _ => None,
    }
}

/// Types whose backends accept two probe shapes (chat messages first,
/// Gemini contents as fallback).
pub fn is_dual_format(provider_type: &str) -> bool {
    provider_type == OPENAI_IFLOW
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rule_classifies_families() {
        assert_eq!(protocol_family("gemini-cli-oauth"), Some(Proto::Gemini));
        assert_eq!(protocol_family("claude-kiro-oauth"), Some(Proto::Claude));
        assert_eq!(protocol_family("openai-qwen-oauth"), Some(Proto::OpenAIChat));
        assert_eq!(
            protocol_family("openai-responses"),
            Some(Proto::OpenAIResponse)
        );
        assert_eq!(protocol_family("mystery-backend"), None);
    }

    #[test]
    fn empty_capability_list_accepts_any_model() {
        assert!(supports_model("claude-custom", "anything-at-all"));
        assert!(supports_model("gemini-cli-oauth", "gemini-2.5-pro"));
        assert!(!supports_model("gemini-cli-oauth", "claude-sonnet-4-5"));
    }
}
