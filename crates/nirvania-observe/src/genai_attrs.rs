//! OpenTelemetry GenAI Semantic Convention attribute constants, plus the
//! skill-run attributes Nirvania adds on top.
//!
//! Usable with `Span::record` and as documentation of the dotted field names
//! written inline in `tracing` span macros.
//!
//! Span names: `skill.execute` (one engine run), `gen_ai.reason` (one
//! reasoning call), `skill.run` (one recorded CLI run).

// --- GenAI: required attributes ---

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "anthropic").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- GenAI: recommended attributes ---

/// The model ID requested (e.g., "claude-sonnet-4-20250514").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reasons for the response (e.g., "end_turn", "tool_use").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

// --- Skill attributes ---

pub const SKILL_ID: &str = "skill.id";

pub const SKILL_NAME: &str = "skill.name";

/// Whether mutating tools were simulated.
pub const SKILL_TEST_MODE: &str = "skill.test_mode";

pub const SKILL_RUN_ID: &str = "skill.run.id";

/// Terminal status: succeeded, failed, exited or pending_approval.
pub const SKILL_RUN_STATUS: &str = "skill.run.status";

pub const SKILL_RUN_DURATION_MS: &str = "skill.run.duration_ms";

/// Number of distinct tools that ran during the run.
pub const SKILL_RUN_TOOLS_USED: &str = "skill.run.tools_used";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

// --- Provider name values ---

pub const PROVIDER_ANTHROPIC: &str = "anthropic";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_namespaces() {
        for attr in [
            GEN_AI_OPERATION_NAME,
            GEN_AI_PROVIDER_NAME,
            GEN_AI_REQUEST_MODEL,
            GEN_AI_REQUEST_TEMPERATURE,
            GEN_AI_REQUEST_MAX_TOKENS,
            GEN_AI_USAGE_INPUT_TOKENS,
            GEN_AI_USAGE_OUTPUT_TOKENS,
            GEN_AI_RESPONSE_FINISH_REASONS,
        ] {
            assert!(attr.starts_with("gen_ai."), "{attr}");
        }
        for attr in [
            SKILL_ID,
            SKILL_NAME,
            SKILL_TEST_MODE,
            SKILL_RUN_ID,
            SKILL_RUN_STATUS,
            SKILL_RUN_DURATION_MS,
            SKILL_RUN_TOOLS_USED,
        ] {
            assert!(attr.starts_with("skill."), "{attr}");
        }
    }
}
