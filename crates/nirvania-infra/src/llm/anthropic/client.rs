//! AnthropicProvider -- concrete [`LlmProvider`] implementation for Anthropic Claude.
//!
//! Sends requests to the Anthropic Messages API (`/v1/messages`) with
//! proper authentication headers, tool definitions and content blocks.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use nirvania_core::llm::provider::LlmProvider;
use nirvania_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
};

use super::types::{
    AnthropicContentBlock, AnthropicErrorBody, AnthropicRequest, AnthropicResponse,
};

/// Anthropic Claude LLM provider.
///
/// The API key is only exposed when constructing HTTP request headers.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    capabilities: ProviderCapabilities,
}

impl AnthropicProvider {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Create a new Anthropic provider for `model`.
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        let capabilities = Self::capabilities_for_model(&model);

        Self {
            client,
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            model,
            capabilities,
        }
    }

    /// The default model for this provider.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Determine capabilities based on model name.
    fn capabilities_for_model(model: &str) -> ProviderCapabilities {
        let max_output_tokens = if model.contains("opus") {
            32_000
        } else if model.contains("sonnet") || model.contains("haiku") {
            8_192
        } else {
            4_096
        };
        ProviderCapabilities {
            tool_calling: true,
            max_context_tokens: 200_000,
            max_output_tokens,
        }
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`CompletionRequest`] into an [`AnthropicRequest`].
    fn to_anthropic_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        AnthropicRequest {
            model,
            max_tokens: request.max_tokens,
            messages: request.messages.iter().map(Into::into).collect(),
            system: request.system.clone(),
            temperature: request.temperature,
            tools: request.tools.iter().map(Into::into).collect(),
        }
    }
}

/// Map a non-2xx response to an [`LlmError`].
fn map_error_status(status: StatusCode, headers: &HeaderMap, body: &str) -> LlmError {
    let message = serde_json::from_str::<AnthropicErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        400 => LlmError::InvalidRequest(message),
        401 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000),
        },
        529 => LlmError::Overloaded(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

fn parse_stop_reason(raw: Option<&str>) -> StopReason {
    raw.and_then(|s| s.parse().ok()).unwrap_or(StopReason::EndTurn)
}

// No Debug impl: keeps the client and key out of formatted output.

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_anthropic_request(request);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Sending Anthropic request"
        );

        let response = self
            .client
            .post(self.url("/v1/messages"))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status, &headers, &error_body));
        }

        let anthropic_resp: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        Ok(CompletionResponse {
            id: anthropic_resp.id,
            content: anthropic_resp
                .content
                .into_iter()
                .filter_map(AnthropicContentBlock::into_content_block)
                .collect(),
            model: anthropic_resp.model,
            stop_reason: parse_stop_reason(anthropic_resp.stop_reason.as_deref()),
            usage: Usage {
                input_tokens: anthropic_resp.usage.input_tokens,
                output_tokens: anthropic_resp.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nirvania_types::llm::{ContentBlock, Message, MessageRole, ToolDefinition};
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn make_provider() -> AnthropicProvider {
        AnthropicProvider::new(
            SecretString::from("test-key-not-real"),
            "claude-sonnet-4-20250514".to_string(),
        )
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(make_provider().name(), "anthropic");
    }

    #[test]
    fn test_capabilities_by_model() {
        let caps = make_provider().capabilities().clone();
        assert_eq!(caps.max_output_tokens, 8_192);
        assert!(caps.tool_calling);

        let opus = AnthropicProvider::new(
            SecretString::from("k"),
            "claude-opus-4-20250514".to_string(),
        );
        assert_eq!(opus.capabilities().max_output_tokens, 32_000);
    }

    #[test]
    fn test_to_anthropic_request_carries_tools_and_blocks() {
        let provider = make_provider();
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![
                Message::user_text("Find Ana"),
                Message {
                    role: MessageRole::Assistant,
                    content: vec![ContentBlock::ToolUse {
                        id: "toolu_1".to_string(),
                        name: "search_contacts".to_string(),
                        input: json!({"query": "Ana"}),
                    }],
                },
            ],
            system: Some("Be helpful".to_string()),
            max_tokens: 1024,
            temperature: Some(0.7),
            tools: vec![ToolDefinition {
                name: "search_contacts".to_string(),
                description: "Search".to_string(),
                input_schema: json!({"type": "object"}),
            }],
        };

        let anthropic_req = provider.to_anthropic_request(&request);
        assert_eq!(anthropic_req.model, "claude-sonnet-4-20250514");
        assert_eq!(anthropic_req.messages.len(), 2);
        assert_eq!(anthropic_req.messages[1].role, "assistant");
        assert_eq!(anthropic_req.tools.len(), 1);
        assert_eq!(anthropic_req.system.as_deref(), Some("Be helpful"));
    }

    #[test]
    fn test_base_url_override() {
        let provider = make_provider().with_base_url("http://localhost:8080".to_string());
        assert_eq!(provider.url("/v1/messages"), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_error_status_mapping() {
        let empty = HeaderMap::new();
        assert!(matches!(
            map_error_status(StatusCode::UNAUTHORIZED, &empty, ""),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            map_error_status(StatusCode::from_u16(529).unwrap(), &empty, "busy"),
            LlmError::Overloaded(m) if m == "busy"
        ));

        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad tools"}}"#;
        assert!(matches!(
            map_error_status(StatusCode::BAD_REQUEST, &empty, body),
            LlmError::InvalidRequest(m) if m == "bad tools"
        ));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert!(matches!(
            map_error_status(StatusCode::TOO_MANY_REQUESTS, &headers, ""),
            LlmError::RateLimited { retry_after_ms: Some(3000) }
        ));
    }

    #[test]
    fn test_unknown_stop_reason_defaults_to_end_turn() {
        assert_eq!(parse_stop_reason(Some("tool_use")), StopReason::ToolUse);
        assert_eq!(parse_stop_reason(Some("refusal")), StopReason::EndTurn);
        assert_eq!(parse_stop_reason(None), StopReason::EndTurn);
    }
}
