//! Built-in provider catalog.

use super::Provider;

/// OpenAI-compatible providers known out of the box.
pub(super) fn builtin_providers() -> Vec<Provider> {
    vec![
        Provider::new(
            "OpenAI",
            "https://openai.com",
            "https://api.openai.com/v1",
            "GPT family models via the OpenAI API",
            "gpt-3.5-turbo",
        ),
        Provider::new(
            "DeepSeek",
            "https://www.deepseek.com",
            "https://api.deepseek.com",
            "DeepSeek chat and reasoning models",
            "deepseek-chat",
        ),
        Provider::new(
            "Volcengine",
            "https://www.volces.com",
            "https://ark.cn-beijing.volces.com/api/v3",
            "Volcengine Ark model service",
            "deepseek-v3-250324",
        ),
    ]
}
