//! Reasoning-provider exchange types.
//!
//! One reasoning step either answers or asks for tool calls. The engine keeps
//! the history of prior steps as [`ReasoningTurn`]s, each pairing the
//! requested calls with their observations in request order.

use serde::{Deserialize, Serialize};

use crate::llm::ToolDefinition;

/// A tool call requested by the reasoning provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call identifier, echoed back with the observation.
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// What a reasoning provider decided on one iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningStep {
    FinalAnswer(String),
    ToolCalls {
        /// Optional text the model produced alongside its calls.
        thought: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
}

/// Result of one tool call as fed back to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolObservation {
    pub content: String,
    pub is_error: bool,
}

impl ToolObservation {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A tool call paired with its observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExchange {
    pub call: ToolCallRequest,
    pub observation: ToolObservation,
}

/// One completed tool-calling iteration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReasoningTurn {
    pub thought: Option<String>,
    pub exchanges: Vec<ToolExchange>,
}

/// Everything a reasoning provider sees on one iteration.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    pub system_prompt: String,
    pub input: String,
    pub tools: Vec<ToolDefinition>,
    pub history: Vec<ReasoningTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_constructors() {
        assert!(!ToolObservation::ok("{}").is_error);
        let err = ToolObservation::error("boom");
        assert!(err.is_error);
        assert_eq!(err.content, "boom");
    }
}
