//! Reasoning provider port and its LLM-backed adapter.
//!
//! The execution engine only ever talks to a [`ReasoningProvider`]: given the
//! system prompt, the user input, the tool catalog and the prior tool-call
//! history, it decides between a final answer and more tool calls.
//! [`LlmReasoningProvider`] implements that decision on top of any
//! [`LlmProvider`] with tool calling.

use tracing::{Instrument, debug, info_span};

use nirvania_types::config::GlobalConfig;
use nirvania_types::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmError, Message, MessageRole,
};
use nirvania_types::reasoning::{ReasoningRequest, ReasoningStep, ReasoningTurn, ToolCallRequest};

use super::box_provider::BoxLlmProvider;

/// Decides the next step of a skill run.
///
/// Implementations must be cancel-safe: the engine drops the returned future
/// when the run times out or is cancelled.
pub trait ReasoningProvider: Send + Sync {
    /// Provider name for logs and spans.
    fn name(&self) -> &str;

    fn ask(
        &self,
        request: &ReasoningRequest,
    ) -> impl std::future::Future<Output = Result<ReasoningStep, LlmError>> + Send;
}

/// [`ReasoningProvider`] over a chat-completion LLM with native tool use.
pub struct LlmReasoningProvider {
    provider: BoxLlmProvider,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl LlmReasoningProvider {
    pub fn new(provider: BoxLlmProvider, model: String, max_tokens: u32, temperature: f64) -> Self {
        Self {
            provider,
            model,
            max_tokens,
            temperature,
        }
    }

    pub fn from_config(provider: BoxLlmProvider, config: &GlobalConfig) -> Self {
        Self::new(
            provider,
            config.model.clone(),
            config.max_tokens,
            config.temperature,
        )
    }

    /// Render a reasoning request as a completion request.
    ///
    /// `max_tokens` is capped at the provider's output limit.
    ///
    /// Each prior turn becomes an assistant message holding the `tool_use`
    /// blocks followed by a user message holding the matching `tool_result`
    /// blocks, both in request order.
    pub fn build_request(&self, request: &ReasoningRequest) -> CompletionRequest {
        let mut messages = Vec::with_capacity(1 + request.history.len() * 2);
        messages.push(Message::user_text(request.input.clone()));

        for turn in &request.history {
            messages.extend(turn_messages(turn));
        }

        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: Some(request.system_prompt.clone()),
            max_tokens: self
                .max_tokens
                .min(self.provider.capabilities().max_output_tokens),
            temperature: Some(self.temperature),
            tools: request.tools.clone(),
        }
    }
}

fn turn_messages(turn: &ReasoningTurn) -> [Message; 2] {
    let mut assistant = Vec::with_capacity(turn.exchanges.len() + 1);
    if let Some(thought) = turn.thought.as_ref().filter(|t| !t.trim().is_empty()) {
        assistant.push(ContentBlock::Text {
            text: thought.clone(),
        });
    }
    assistant.extend(turn.exchanges.iter().map(|ex| ContentBlock::ToolUse {
        id: ex.call.id.clone(),
        name: ex.call.name.clone(),
        input: ex.call.input.clone(),
    }));

    let results = turn
        .exchanges
        .iter()
        .map(|ex| ContentBlock::ToolResult {
            tool_use_id: ex.call.id.clone(),
            content: ex.observation.content.clone(),
            is_error: ex.observation.is_error,
        })
        .collect();

    [
        Message {
            role: MessageRole::Assistant,
            content: assistant,
        },
        Message {
            role: MessageRole::User,
            content: results,
        },
    ]
}

/// Map a completion response onto a reasoning step.
///
/// Any `tool_use` block makes the step a tool-call step; otherwise the
/// concatenated text is the final answer.
pub fn interpret_response(response: &CompletionResponse) -> ReasoningStep {
    let calls: Vec<ToolCallRequest> = response
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCallRequest {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        })
        .collect();

    let text = response.text();
    if calls.is_empty() {
        ReasoningStep::FinalAnswer(text)
    } else {
        let thought = (!text.trim().is_empty()).then_some(text);
        ReasoningStep::ToolCalls { thought, calls }
    }
}

impl ReasoningProvider for LlmReasoningProvider {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn ask(&self, request: &ReasoningRequest) -> Result<ReasoningStep, LlmError> {
        if !request.tools.is_empty() && !self.provider.capabilities().tool_calling {
            return Err(LlmError::InvalidRequest(format!(
                "provider '{}' does not support tool calling",
                self.provider.name()
            )));
        }
        let completion = self.build_request(request);

        let span = info_span!(
            "gen_ai.reason",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %completion.model,
            gen_ai.request.max_tokens = completion.max_tokens,
            gen_ai.request.temperature = ?completion.temperature,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            skill.history_turns = request.history.len(),
        );

        let response = self
            .provider
            .complete(&completion)
            .instrument(span.clone())
            .await?;
        span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
        span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);
        span.record(
            "gen_ai.response.finish_reasons",
            tracing::field::display(&response.stop_reason),
        );
        debug!(
            stop_reason = %response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Reasoning step received"
        );

        Ok(interpret_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    use nirvania_types::llm::{ProviderCapabilities, StopReason, ToolDefinition, Usage};
    use nirvania_types::reasoning::{ToolExchange, ToolObservation};
    use serde_json::json;

    use crate::llm::provider::LlmProvider;

    struct CannedProvider {
        capabilities: ProviderCapabilities,
        content: Vec<ContentBlock>,
    }

    impl CannedProvider {
        fn new(content: Vec<ContentBlock>) -> Self {
            Self {
                capabilities: ProviderCapabilities {
                    tool_calling: true,
                    max_context_tokens: 200_000,
                    max_output_tokens: 4_096,
                },
                content,
            }
        }

        fn text_only() -> Self {
            Self {
                capabilities: ProviderCapabilities {
                    tool_calling: false,
                    max_context_tokens: 8_192,
                    max_output_tokens: 256,
                },
                content: vec![ContentBlock::Text {
                    text: "plain".to_string(),
                }],
            }
        }
    }

    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
            let content = self.content.clone();
            async move {
                Ok(CompletionResponse {
                    id: "msg_1".to_string(),
                    content,
                    model: "canned-model".to_string(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                })
            }
        }
    }

    fn request_with_history() -> ReasoningRequest {
        ReasoningRequest {
            system_prompt: "SYSTEM".to_string(),
            input: "find acme".to_string(),
            tools: vec![ToolDefinition {
                name: "search_contacts".to_string(),
                description: "search".to_string(),
                input_schema: json!({"type": "object"}),
            }],
            history: vec![ReasoningTurn {
                thought: Some("Searching first.".to_string()),
                exchanges: vec![
                    ToolExchange {
                        call: ToolCallRequest {
                            id: "t1".to_string(),
                            name: "search_contacts".to_string(),
                            input: json!({"query": "acme"}),
                        },
                        observation: ToolObservation::ok("{\"count\":1}"),
                    },
                    ToolExchange {
                        call: ToolCallRequest {
                            id: "t2".to_string(),
                            name: "nope".to_string(),
                            input: json!({}),
                        },
                        observation: ToolObservation::error("unknown tool 'nope'"),
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_build_request_renders_history_in_order() {
        let provider = LlmReasoningProvider::new(
            BoxLlmProvider::new(CannedProvider::new(vec![])),
            "model-x".to_string(),
            1024,
            0.5,
        );
        let req = provider.build_request(&request_with_history());

        assert_eq!(req.system.as_deref(), Some("SYSTEM"));
        assert_eq!(req.tools.len(), 1);
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[0].text(), "find acme");

        let assistant = &req.messages[1];
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert!(matches!(&assistant.content[0], ContentBlock::Text { text } if text == "Searching first."));
        assert!(matches!(&assistant.content[1], ContentBlock::ToolUse { id, .. } if id == "t1"));
        assert!(matches!(&assistant.content[2], ContentBlock::ToolUse { id, .. } if id == "t2"));

        let results = &req.messages[2];
        assert_eq!(results.role, MessageRole::User);
        match &results.content[..] {
            [
                ContentBlock::ToolResult {
                    tool_use_id: a,
                    is_error: false,
                    ..
                },
                ContentBlock::ToolResult {
                    tool_use_id: b,
                    is_error: true,
                    ..
                },
            ] => {
                assert_eq!(a, "t1");
                assert_eq!(b, "t2");
            }
            other => panic!("unexpected tool results: {other:?}"),
        }
    }

    #[test]
    fn test_interpret_text_only_is_final_answer() {
        let response = CompletionResponse {
            id: "m".to_string(),
            content: vec![ContentBlock::Text {
                text: "Hello!".to_string(),
            }],
            model: "x".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        };
        assert_eq!(
            interpret_response(&response),
            ReasoningStep::FinalAnswer("Hello!".to_string())
        );
    }

    #[test]
    fn test_interpret_tool_use_keeps_order_and_thought() {
        let response = CompletionResponse {
            id: "m".to_string(),
            content: vec![
                ContentBlock::Text {
                    text: "Checking.".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "a".to_string(),
                    name: "search_contacts".to_string(),
                    input: json!({}),
                },
                ContentBlock::ToolUse {
                    id: "b".to_string(),
                    name: "get_contact_details".to_string(),
                    input: json!({"contact_id": "c1"}),
                },
            ],
            model: "x".to_string(),
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        };

        match interpret_response(&response) {
            ReasoningStep::ToolCalls { thought, calls } => {
                assert_eq!(thought.as_deref(), Some("Checking."));
                let ids: Vec<_> = calls.iter().map(|c| c.id.as_str()).collect();
                assert_eq!(ids, vec!["a", "b"]);
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ask_uses_configured_model() {
        let config = GlobalConfig {
            model: "claude-test".to_string(),
            max_tokens: 512,
            ..GlobalConfig::default()
        };
        let provider = LlmReasoningProvider::from_config(
            BoxLlmProvider::new(CannedProvider::new(vec![ContentBlock::Text {
                text: "done".to_string(),
            }])),
            &config,
        );

        let request = request_with_history();
        let completion = provider.build_request(&request);
        assert_eq!(completion.model, "claude-test");
        assert_eq!(completion.max_tokens, 512);

        let step = provider.ask(&request).await.unwrap();
        assert_eq!(step, ReasoningStep::FinalAnswer("done".to_string()));
        assert_eq!(provider.name(), "canned");
    }

    #[test]
    fn test_build_request_caps_max_tokens() {
        let provider = LlmReasoningProvider::new(
            BoxLlmProvider::new(CannedProvider::text_only()),
            "small".to_string(),
            4096,
            0.2,
        );
        let completion = provider.build_request(&request_with_history());
        assert_eq!(completion.max_tokens, 256);
    }

    #[tokio::test]
    async fn test_ask_refuses_tools_without_tool_calling() {
        let provider = LlmReasoningProvider::new(
            BoxLlmProvider::new(CannedProvider::text_only()),
            "small".to_string(),
            256,
            0.2,
        );

        let err = provider.ask(&request_with_history()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(msg) if msg.contains("tool calling")));

        let mut no_tools = request_with_history();
        no_tools.tools.clear();
        no_tools.history.clear();
        let step = provider.ask(&no_tools).await.unwrap();
        assert_eq!(step, ReasoningStep::FinalAnswer("plain".to_string()));
    }
}
