//! Tool catalog types.
//!
//! The catalog is closed: [`ToolName`] enumerates every tool the registry can
//! dispatch, and [`ToolInput`] carries the typed input for each one. The
//! string name is only the external selector used by reasoning providers.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every tool in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    SearchContacts,
    GetContactDetails,
    UpdateContact,
    SendEmail,
    ScheduleMeeting,
    CreateDeal,
    UpdateDealStage,
    LogActivity,
}

impl ToolName {
    /// Catalog order.
    pub const ALL: [ToolName; 8] = [
        ToolName::SearchContacts,
        ToolName::GetContactDetails,
        ToolName::UpdateContact,
        ToolName::SendEmail,
        ToolName::ScheduleMeeting,
        ToolName::CreateDeal,
        ToolName::UpdateDealStage,
        ToolName::LogActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchContacts => "search_contacts",
            ToolName::GetContactDetails => "get_contact_details",
            ToolName::UpdateContact => "update_contact",
            ToolName::SendEmail => "send_email",
            ToolName::ScheduleMeeting => "schedule_meeting",
            ToolName::CreateDeal => "create_deal",
            ToolName::UpdateDealStage => "update_deal_stage",
            ToolName::LogActivity => "log_activity",
        }
    }

    pub fn effect(&self) -> ToolEffect {
        match self {
            ToolName::SearchContacts | ToolName::GetContactDetails => ToolEffect::ReadOnly,
            _ => ToolEffect::Mutating,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    /// Case-sensitive: names must match their snake_case identifier exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Side-effect classification of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEffect {
    /// Reads CRM state only. Runs normally in test mode.
    ReadOnly,
    /// Changes CRM state or contacts the outside world. Simulated in test mode.
    Mutating,
}

impl fmt::Display for ToolEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolEffect::ReadOnly => write!(f, "read-only"),
            ToolEffect::Mutating => write!(f, "mutating"),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed inputs
// ---------------------------------------------------------------------------

fn default_search_limit() -> u32 {
    50
}

fn default_meeting_duration() -> u32 {
    30
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_stage() -> String {
    "Prospect".to_string()
}

/// Input for `search_contacts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchContactsInput {
    /// Free-text search over name, email and company.
    #[serde(default)]
    pub query: Option<String>,
    /// Country code filter (MX, BR, CO, ...).
    #[serde(default)]
    pub country: Option<String>,
    /// Only contacts with (true) or without (false) open deals.
    #[serde(default)]
    pub has_deals: Option<bool>,
    /// Only contacts not contacted within this many days.
    #[serde(default)]
    pub last_contacted_days_ago: Option<u32>,
    /// Maximum number of results.
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

/// Input for `get_contact_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GetContactDetailsInput {
    pub contact_id: String,
}

/// Fields `update_contact` may change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContactUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for `update_contact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateContactInput {
    pub contact_id: String,
    pub updates: ContactUpdates,
}

/// Input for `send_email`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SendEmailInput {
    /// Recipient address.
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Contact to attach the email activity to.
    #[serde(default)]
    pub contact_id: Option<String>,
}

/// Input for `schedule_meeting`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleMeetingInput {
    pub contact_id: String,
    pub title: String,
    /// ISO 8601 start time.
    pub datetime: String,
    /// Duration in minutes.
    #[serde(default = "default_meeting_duration")]
    pub duration: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for `create_deal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CreateDealInput {
    pub name: String,
    /// Primary contact.
    pub contact_id: String,
    pub company_id: String,
    pub amount: f64,
    /// ISO currency code (USD, MXN, BRL, ...).
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Initial pipeline stage.
    #[serde(default = "default_stage")]
    pub stage: String,
}

/// Input for `update_deal_stage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateDealStageInput {
    pub deal_id: String,
    /// New stage (Prospect, Qualification, Proposal, Negotiation, Closed).
    pub new_stage: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Activity kinds accepted by `log_activity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Note,
    Task,
}

/// Input for `log_activity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogActivityInput {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub deal_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A decoded tool call: which tool, with its typed input.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    SearchContacts(SearchContactsInput),
    GetContactDetails(GetContactDetailsInput),
    UpdateContact(UpdateContactInput),
    SendEmail(SendEmailInput),
    ScheduleMeeting(ScheduleMeetingInput),
    CreateDeal(CreateDealInput),
    UpdateDealStage(UpdateDealStageInput),
    LogActivity(LogActivityInput),
}

impl ToolInput {
    /// Decode raw JSON input for the given tool.
    pub fn decode(name: ToolName, input: serde_json::Value) -> Result<Self, ToolError> {
        fn parse<T: serde::de::DeserializeOwned>(
            name: ToolName,
            input: serde_json::Value,
        ) -> Result<T, ToolError> {
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput {
                tool: name.as_str().to_string(),
                reason: e.to_string(),
            })
        }

        Ok(match name {
            ToolName::SearchContacts => ToolInput::SearchContacts(parse(name, input)?),
            ToolName::GetContactDetails => ToolInput::GetContactDetails(parse(name, input)?),
            ToolName::UpdateContact => ToolInput::UpdateContact(parse(name, input)?),
            ToolName::SendEmail => ToolInput::SendEmail(parse(name, input)?),
            ToolName::ScheduleMeeting => ToolInput::ScheduleMeeting(parse(name, input)?),
            ToolName::CreateDeal => ToolInput::CreateDeal(parse(name, input)?),
            ToolName::UpdateDealStage => ToolInput::UpdateDealStage(parse(name, input)?),
            ToolName::LogActivity => ToolInput::LogActivity(parse(name, input)?),
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolInput::SearchContacts(_) => ToolName::SearchContacts,
            ToolInput::GetContactDetails(_) => ToolName::GetContactDetails,
            ToolInput::UpdateContact(_) => ToolName::UpdateContact,
            ToolInput::SendEmail(_) => ToolName::SendEmail,
            ToolInput::ScheduleMeeting(_) => ToolName::ScheduleMeeting,
            ToolInput::CreateDeal(_) => ToolName::CreateDeal,
            ToolInput::UpdateDealStage(_) => ToolName::UpdateDealStage,
            ToolInput::LogActivity(_) => ToolName::LogActivity,
        }
    }
}

/// Errors from a single tool invocation.
///
/// None of these are fatal to a run: the engine feeds the message back to the
/// reasoning provider as an error observation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{0}' is not available to this skill")]
    NotAllowed(String),

    #[error("invalid input for '{tool}': {reason}")]
    InvalidInput { tool: String, reason: String },

    #[error("{tool} failed: {message}")]
    Gateway { tool: String, message: String },
}
