//! Anthropic Claude LLM provider implementation.
//!
//! This module provides the [`AnthropicProvider`] which implements the
//! [`LlmProvider`](nirvania_core::llm::provider::LlmProvider) trait for
//! the Anthropic Messages API with tool use.

pub mod client;
pub mod types;

pub use client::AnthropicProvider;
