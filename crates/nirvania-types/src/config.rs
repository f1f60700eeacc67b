//! Global configuration types for Nirvania.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! reasoning model and the default execution budgets.

use serde::{Deserialize, Serialize};

use crate::execution::{DEFAULT_MAX_ITERATIONS, DEFAULT_TIMEOUT, UnknownToolPolicy};

/// Top-level configuration for the skill engine.
///
/// Loaded from `~/.nirvania/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Model identifier sent to the reasoning provider.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum output tokens per reasoning call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Default iteration budget per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Default wall-clock budget per run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub unknown_tool_policy: UnknownToolPolicy,

    #[serde(default)]
    pub parallel_tool_calls: bool,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            timeout_secs: default_timeout_secs(),
            unknown_tool_policy: UnknownToolPolicy::default(),
            parallel_tool_calls: false,
        }
    }
}
