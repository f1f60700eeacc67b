//! LLM provider implementations.
//!
//! Contains the Anthropic implementation of the [`LlmProvider`] trait
//! defined in `nirvania-core`, plus a factory that wraps it as the
//! engine's reasoning provider.
//!
//! [`LlmProvider`]: nirvania_core::llm::provider::LlmProvider

pub mod anthropic;

use secrecy::SecretString;

use nirvania_core::llm::box_provider::BoxLlmProvider;
use nirvania_core::llm::reasoning::LlmReasoningProvider;
use nirvania_types::config::GlobalConfig;
use nirvania_types::llm::LlmError;

use self::anthropic::AnthropicProvider;

/// Build the reasoning provider used by skill runs.
///
/// Fails with [`LlmError::AuthenticationFailed`] when no API key is available.
pub fn create_reasoning_provider(
    config: &GlobalConfig,
    api_key: Option<SecretString>,
) -> Result<LlmReasoningProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    let provider = AnthropicProvider::new(key, config.model.clone());
    Ok(LlmReasoningProvider::from_config(
        BoxLlmProvider::new(provider),
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nirvania_core::llm::reasoning::ReasoningProvider;

    #[test]
    fn test_create_reasoning_provider() {
        let provider = create_reasoning_provider(
            &GlobalConfig::default(),
            Some(SecretString::from("sk-test-key")),
        )
        .unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn test_create_reasoning_provider_missing_key() {
        let result = create_reasoning_provider(&GlobalConfig::default(), None);
        assert!(matches!(result, Err(LlmError::AuthenticationFailed)));
    }
}
