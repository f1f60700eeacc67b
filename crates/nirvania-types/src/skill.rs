//! Skill domain types.
//!
//! A skill is a user-authored automation assigned to one agent category:
//! natural-language goal, instructions, restrictions and memory, plus the
//! execution policy (manual approval, tool allow-list, lifecycle status).
//! Run records and outcome counters live here too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::execution::ExecutionStatus;

/// Unique identifier for a skill, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub Uuid);

impl SkillId {
    /// Create a new SkillId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a SkillId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SkillId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SkillId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Skill lifecycle states.
///
/// - Active: runs on demand and on its triggers
/// - Inactive: switched off; execution is refused at validation
/// - Paused: kept configured but temporarily not triggered (still runnable on demand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Active,
    Inactive,
    Paused,
}

impl fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillStatus::Active => write!(f, "active"),
            SkillStatus::Inactive => write!(f, "inactive"),
            SkillStatus::Paused => write!(f, "paused"),
        }
    }
}

impl FromStr for SkillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SkillStatus::Active),
            "inactive" => Ok(SkillStatus::Inactive),
            "paused" => Ok(SkillStatus::Paused),
            other => Err(format!("invalid skill status: '{other}'")),
        }
    }
}

impl Default for SkillStatus {
    fn default() -> Self {
        SkillStatus::Active
    }
}

/// Agent categories a skill can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    AccountManager,
    OutboundManager,
    InboundManager,
    SystemManager,
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentType::AccountManager => write!(f, "account_manager"),
            AgentType::OutboundManager => write!(f, "outbound_manager"),
            AgentType::InboundManager => write!(f, "inbound_manager"),
            AgentType::SystemManager => write!(f, "system_manager"),
        }
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "account_manager" => Ok(AgentType::AccountManager),
            "outbound_manager" => Ok(AgentType::OutboundManager),
            "inbound_manager" => Ok(AgentType::InboundManager),
            "system_manager" => Ok(AgentType::SystemManager),
            other => Err(format!("invalid agent type: '{other}'")),
        }
    }
}

/// The agent a skill belongs to. Supplies the role preamble of the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub agent_type: AgentType,
}

/// Outcome counters rolled up from terminal run results.
///
/// Only the run recorder mutates these, through [`SkillCounters::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCounters {
    pub total_runs: u64,
    pub succeeded: u64,
    pub errors: u64,
    pub exited: u64,
    pub in_progress: u64,
}

impl SkillCounters {
    /// Roll one terminal status into the counters.
    ///
    /// `total_runs` always increments; exactly one of `succeeded`, `errors`,
    /// `exited` increments for the matching status. `PendingApproval` touches
    /// no outcome counter.
    pub fn apply(&mut self, status: ExecutionStatus) {
        self.total_runs += 1;
        if let Some(field) = CounterField::for_status(status) {
            match field {
                CounterField::Succeeded => self.succeeded += 1,
                CounterField::Errors => self.errors += 1,
                CounterField::Exited => self.exited += 1,
            }
        }
    }
}

/// Which outcome counter a terminal status maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    Succeeded,
    Errors,
    Exited,
}

impl CounterField {
    pub fn for_status(status: ExecutionStatus) -> Option<Self> {
        match status {
            ExecutionStatus::Succeeded => Some(CounterField::Succeeded),
            ExecutionStatus::Failed => Some(CounterField::Errors),
            ExecutionStatus::Exited => Some(CounterField::Exited),
            ExecutionStatus::PendingApproval => None,
        }
    }
}

/// A user-authored automation.
///
/// A run works on an owned clone of the skill taken at start time, so edits
/// made while a run is in flight never leak into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default)]
    pub id: SkillId,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub agent: Option<AgentProfile>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub restrictions: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub manual_approval: bool,
    /// Explicit tool allow-list. `None` makes every registered tool eligible.
    #[serde(default)]
    pub tools: Option<Vec<String>>,
    #[serde(default)]
    pub status: SkillStatus,
    #[serde(default)]
    pub counters: SkillCounters,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Skill {
    /// A minimal active skill with the given name and instructions.
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SkillId::new(),
            owner_id: None,
            agent: None,
            name: name.into(),
            description: None,
            goal: None,
            instructions: instructions.into(),
            restrictions: None,
            memory: None,
            manual_approval: false,
            tools: None,
            status: SkillStatus::Active,
            counters: SkillCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Persisted run status. Superset of [`ExecutionStatus`] with the
/// `Running` state a run holds from its start until it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillRunStatus {
    Running,
    Succeeded,
    Failed,
    Exited,
    PendingApproval,
}

impl From<ExecutionStatus> for SkillRunStatus {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Succeeded => SkillRunStatus::Succeeded,
            ExecutionStatus::Failed => SkillRunStatus::Failed,
            ExecutionStatus::Exited => SkillRunStatus::Exited,
            ExecutionStatus::PendingApproval => SkillRunStatus::PendingApproval,
        }
    }
}

impl fmt::Display for SkillRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillRunStatus::Running => write!(f, "running"),
            SkillRunStatus::Succeeded => write!(f, "succeeded"),
            SkillRunStatus::Failed => write!(f, "failed"),
            SkillRunStatus::Exited => write!(f, "exited"),
            SkillRunStatus::PendingApproval => write!(f, "pending_approval"),
        }
    }
}

impl FromStr for SkillRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(SkillRunStatus::Running),
            "succeeded" => Ok(SkillRunStatus::Succeeded),
            "failed" => Ok(SkillRunStatus::Failed),
            "exited" => Ok(SkillRunStatus::Exited),
            "pending_approval" => Ok(SkillRunStatus::PendingApproval),
            other => Err(format!("invalid run status: '{other}'")),
        }
    }
}

/// A persisted execution record ("skill run").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRun {
    pub id: Uuid,
    pub skill_id: SkillId,
    pub status: SkillRunStatus,
    pub input: String,
    pub test_mode: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub logs: Vec<crate::execution::LogEntry>,
    pub tools_used: Vec<String>,
    pub tool_calls: Vec<crate::execution::ToolCallRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl SkillRun {
    /// A fresh `Running` record for a run that is about to start.
    pub fn started(skill_id: SkillId, input: impl Into<String>, test_mode: bool) -> Self {
        Self {
            id: Uuid::now_v7(),
            skill_id,
            status: SkillRunStatus::Running,
            input: input.into(),
            test_mode,
            output: None,
            error: None,
            logs: Vec::new(),
            tools_used: Vec::new(),
            tool_calls: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    /// Fold a terminal result into this record.
    pub fn complete(&mut self, result: &crate::execution::ExecutionResult) {
        self.status = result.status.into();
        self.output = result.output.clone();
        self.error = result.error.clone();
        self.logs = result.logs.clone();
        self.tools_used = result.tools_used.iter().cloned().collect();
        self.tool_calls = result.tool_calls.clone();
        self.completed_at = Some(Utc::now());
        self.duration_ms = Some(result.duration_ms);
    }
}
