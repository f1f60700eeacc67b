//! Execution types: per-run options, log entries, tool-call records and the
//! terminal [`ExecutionResult`].

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GlobalConfig;
use crate::skill::Skill;

/// Default iteration budget for the reasoning loop.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Default wall-clock budget for the reasoning loop (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How an explicit tool allow-list treats names the registry does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownToolPolicy {
    /// Drop unknown names silently.
    #[default]
    Ignore,
    /// Refuse the run when any name is unknown.
    Reject,
}

/// Per-invocation configuration for one skill run.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Simulate mutating tool calls instead of performing them.
    pub test_mode: bool,
    /// Approval override. `None` derives the gate from `skill.manual_approval`.
    pub require_approval: Option<bool>,
    /// Narrows the set of tools offered to the reasoning provider.
    pub tool_names: Option<BTreeSet<String>>,
    pub max_iterations: u32,
    pub timeout: Duration,
    pub unknown_tool_policy: UnknownToolPolicy,
    /// Dispatch all tool calls of one reasoning step concurrently.
    pub parallel_tool_calls: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            test_mode: true,
            require_approval: None,
            tool_names: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: DEFAULT_TIMEOUT,
            unknown_tool_policy: UnknownToolPolicy::Ignore,
            parallel_tool_calls: false,
        }
    }
}

impl ExecutionOptions {
    /// Options seeded from the global configuration.
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            timeout: Duration::from_secs(config.timeout_secs),
            unknown_tool_policy: config.unknown_tool_policy,
            parallel_tool_calls: config.parallel_tool_calls,
            ..Self::default()
        }
    }

    pub fn live(mut self) -> Self {
        self.test_mode = false;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_require_approval(mut self, require: bool) -> Self {
        self.require_approval = Some(require);
        self
    }

    pub fn with_tool_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_unknown_tool_policy(mut self, policy: UnknownToolPolicy) -> Self {
        self.unknown_tool_policy = policy;
        self
    }

    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    /// Whether the approval gate applies for this skill.
    pub fn requires_approval(&self, skill: &Skill) -> bool {
        self.require_approval.unwrap_or(skill.manual_approval)
    }
}

// ---------------------------------------------------------------------------
// Logs and tool-call records
// ---------------------------------------------------------------------------

/// Severity of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// One line of a run's narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// One observed tool invocation during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Provider-assigned call identifier.
    pub call_id: String,
    pub tool_name: String,
    /// Serialized input as received from the reasoning provider.
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ToolCallRecord {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Terminal status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    /// The iteration budget ran out before a final answer.
    Exited,
    /// A live run stopped at the manual-approval gate.
    PendingApproval,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Succeeded => write!(f, "succeeded"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::Exited => write!(f, "exited"),
            ExecutionStatus::PendingApproval => write!(f, "pending_approval"),
        }
    }
}

/// The single terminal value of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
    pub tools_used: BTreeSet<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub duration_ms: u64,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    /// Result for a skill refused at pre-flight validation.
    ///
    /// No logger or timer existed yet, so logs are empty and duration is zero.
    pub fn rejected(errors: &[String]) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(errors.join("; ")),
            logs: Vec::new(),
            tools_used: BTreeSet::new(),
            tool_calls: Vec::new(),
            duration_ms: 0,
            status: ExecutionStatus::Failed,
        }
    }
}
