//! LLM provider abstractions for Nirvania.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `ReasoningProvider`: the port the execution engine consumes, with an
//!   adapter over any `LlmProvider`

pub mod box_provider;
pub mod provider;
pub mod reasoning;
